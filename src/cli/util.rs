//! CLI Common Utilities
//!
//! Resolves where a run reads from and writes to. Cache and output files
//! live in the working directory and are named after the analyzed folder.

use std::path::{Path, PathBuf};

use crate::constants::cache as cache_constants;
use crate::pipeline::default_cache_path;
use crate::types::{FeatureMapError, Result};

/// Paths used by one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPaths {
    /// Absolute root being analyzed
    pub root: PathBuf,
    /// Last component of `root`
    pub folder: String,
    pub cache: PathBuf,
    pub output: PathBuf,
}

impl TargetPaths {
    /// Resolve `target` (default `.`) against the current directory.
    pub fn resolve(
        target: Option<&Path>,
        cache: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve_in(&cwd, target, cache, output)
    }

    pub fn resolve_in(
        cwd: &Path,
        target: Option<&Path>,
        cache: Option<PathBuf>,
        output: Option<PathBuf>,
    ) -> Result<Self> {
        let root = std::path::absolute(cwd.join(target.unwrap_or(Path::new("."))))?;
        let root = normalize_root(&root);
        if !root.is_dir() {
            return Err(FeatureMapError::Scan(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        let folder = folder_name(&root);
        Ok(Self {
            cache: cache.unwrap_or_else(|| default_cache_path(cwd, &folder)),
            output: output.unwrap_or_else(|| {
                cwd.join(format!("{}{}", folder, cache_constants::OUTPUT_SUFFIX))
            }),
            root,
            folder,
        })
    }
}

/// Drop `.` components so `/a/b/.` names folder `b`.
fn normalize_root(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn folder_name(root: &Path) -> String {
    root.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("root")
        .to_string()
}
