//! Config Command
//!
//! Inspect featuremap configuration.
//!
//! Usage:
//!   featuremap config show [--json]
//!   featuremap config path
//!   featuremap config init [-g] [--force]

use crate::config::ConfigLoader;
use crate::types::Result;

/// Show merged effective config
pub fn show(as_json: bool) -> Result<()> {
    ConfigLoader::show_config(as_json)
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file
pub fn init(global: bool, force: bool) -> Result<()> {
    let existed = if global {
        ConfigLoader::global_config_path().is_some_and(|p| p.exists())
    } else {
        ConfigLoader::project_config_path().exists()
    };

    let config_path = ConfigLoader::init(global, force)?;
    let scope = if global { "global" } else { "project" };
    if existed && !force {
        println!("Config already exists; use --force to overwrite");
    } else {
        println!("✓ Initialized {} configuration", scope);
    }
    println!("  Config:    {}", config_path.display());
    Ok(())
}
