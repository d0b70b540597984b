//! File inventory
//!
//! Walks the analyzed root and returns the files worth describing, sorted by
//! relative path. Selection is by extension or well-known basename.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::gitignore::IgnoreRules;
use crate::types::{FeatureMapError, Result, to_slash};

/// Extensions analyzed by default
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    // Core languages
    "js", "jsx", "ts", "tsx", "py", "go", "rs", "java", "c", "cpp", "h", "hpp", "rb", "php", "cs",
    "swift", "kt", "m",
    // Shell & scripts
    "sh", "bash", "zsh", "bat", "ps1", "cmd", "awk", "sed",
    // Web & UI
    "html", "htm", "css", "scss", "sass", "less", "vue", "svelte", "astro", "twig", "ejs", "pug",
    // Configuration & data
    "json", "json5", "yaml", "yml", "toml", "ini", "env", "xml", "csv", "tsv",
    // Query
    "sql", "graphql", "gql", "prisma",
    // Documentation
    "md", "mdx", "txt",
    // Infrastructure
    "tf", "tfvars", "hcl", "bicep",
    // Other languages
    "dart", "scala", "groovy", "lua", "perl", "pl", "pm", "r", "hs", "elm", "clj", "erl", "ex",
    "exs", "fs", "fsi", "fsx", "vb", "vbs",
];

/// Extension-less files analyzed by default
pub const DEFAULT_BASENAMES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".gitignore",
    ".dockerignore",
    ".eslintignore",
    ".prettierignore",
];

pub struct FileScanner {
    root: PathBuf,
    extensions: Vec<String>,
    basenames: Vec<String>,
    exclude: Vec<String>,
}

impl FileScanner {
    /// Scanner with the default extension and basename lists.
    ///
    /// The root is made absolute so every scanned path is too.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = std::path::absolute(root.as_ref()).map_err(|e| {
            FeatureMapError::Scan(format!("Cannot resolve {}: {}", root.as_ref().display(), e))
        })?;
        if !root.is_dir() {
            return Err(FeatureMapError::Scan(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        Ok(Self {
            root,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            basenames: DEFAULT_BASENAMES.iter().map(|b| b.to_string()).collect(),
            exclude: Vec::new(),
        })
    }

    /// Replace the extension list; basename matching is turned off.
    ///
    /// Accepts `.go` or `go`.
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim())
            .map(|e| e.strip_prefix('.').unwrap_or(e).to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self.basenames.clear();
        self
    }

    /// Extra ignore patterns (gitignore syntax)
    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and return matching files, sorted by relative path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let rules = Arc::new(IgnoreRules::new(&self.root, &self.exclude));
        let filter_rules = Arc::clone(&rules);
        let filter_root = self.root.clone();

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                entry
                    .path()
                    .strip_prefix(&filter_root)
                    .map(|rel| !filter_rules.is_ignored(rel, is_dir))
                    .unwrap_or(true)
            })
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.is_selected(path) {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            if rules.is_ignored(relative, false) {
                continue;
            }

            files.push(ScannedFile {
                relative: to_slash(relative),
                path: path.to_path_buf(),
            });
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        debug!("Scanned {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    fn is_selected(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if self.basenames.iter().any(|b| b == name) {
            return true;
        }

        // `.env` counts as extension "env"
        name.rsplit_once('.')
            .is_some_and(|(_, ext)| self.extensions.iter().any(|e| e == ext))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated
    pub relative: String,
}
