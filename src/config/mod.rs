//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/featuremap/config.toml)
//! 3. Project config (.featuremap/config.toml)
//! 4. Environment variables (FEATUREMAP_*, then the ANTHROPIC_* family)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
