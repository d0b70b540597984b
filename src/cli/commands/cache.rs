//! Cache Command
//!
//! Inspect or delete the resumable cache of a target.
//!
//! Usage:
//!   featuremap cache show [PATH] [--cache FILE] [--json]
//!   featuremap cache clear [PATH] [--cache FILE]

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::TargetPaths;
use crate::pipeline::CacheStore;
use crate::types::Result;

/// Print what the cache for `path` holds
pub fn show(path: Option<PathBuf>, cache: Option<PathBuf>, as_json: bool) -> Result<()> {
    let paths = TargetPaths::resolve(path.as_deref(), cache, None)?;
    let output = Output::new();

    if !paths.cache.exists() {
        output.info(&format!("No cache at {}", paths.cache.display()));
        return Ok(());
    }

    let rt = Runtime::new()?;
    let stats = rt
        .block_on(CacheStore::open(&paths.cache).snapshot())
        .stats();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    output.header(&format!("Cache for {}", paths.folder));
    output.field("Path", paths.cache.display());
    output.field("File analyses", stats.file_analyses);
    output.field("Component summaries", stats.component_summaries);
    output.field(
        "Global architecture",
        if stats.has_global_architecture {
            "yes"
        } else {
            "no"
        },
    );
    if let Some(updated_at) = stats.updated_at {
        output.field("Updated", updated_at.to_rfc3339());
    }
    Ok(())
}

/// Delete the cache for `path`
pub fn clear(path: Option<PathBuf>, cache: Option<PathBuf>) -> Result<()> {
    let paths = TargetPaths::resolve(path.as_deref(), cache, None)?;
    let output = Output::new();

    if CacheStore::remove(&paths.cache)? {
        output.success(&format!("Removed {}", paths.cache.display()));
    } else {
        output.info(&format!("No cache at {}", paths.cache.display()));
    }
    Ok(())
}
