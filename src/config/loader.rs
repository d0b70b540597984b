//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/featuremap/config.toml)
//! 3. Project config (.featuremap/config.toml)
//! 4. Environment variables (FEATUREMAP_* prefix, `__` between section and key)
//! 5. Well-known service variables (ANTHROPIC_*, CLAUDE_CODE_SUBAGENT_MODEL, CONCURRENCY_LIMIT)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde_json::{Map, Value, json};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{FeatureMapError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → FEATUREMAP_* → service env names
    pub fn load() -> Result<Config> {
        let global = Self::global_config_path();
        Self::load_from(
            global.as_deref(),
            &Self::project_config_path(),
            |name| env::var(name).ok(),
        )
    }

    /// Load with explicit file locations and env lookup
    pub fn load_from(
        global_path: Option<&Path>,
        project_path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(project_path));
        }

        // FEATUREMAP_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed("FEATUREMAP_").split("__").lowercase(true));

        figment = figment.merge(Serialized::defaults(service_env_overrides(&lookup)?));

        let config: Config = figment
            .extract()
            .map_err(|e| FeatureMapError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/featuremap/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("featuremap"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project config directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".featuremap")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration (credentials omitted)
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| FeatureMapError::Config(e.to_string()))?
            );
        }

        let credentials = match (&config.llm.api_key, &config.llm.auth_token) {
            (Some(_), _) => "api key",
            (None, Some(_)) => "auth token",
            (None, None) => "none",
        };
        println!("# credentials: {}", credentials);

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default config file, globally or for the current project.
    /// Existing files are kept unless `force` is set.
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let config_path = if global {
            Self::global_config_path().ok_or_else(|| {
                FeatureMapError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        Self::write_default(&config_path, force)?;
        Ok(config_path)
    }

    fn write_default(config_path: &Path, force: bool) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !config_path.exists() || force {
            fs::write(config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(())
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Default config file content (TOML)
    fn default_config() -> String {
        r#"# featuremap configuration
# Project settings in .featuremap/config.toml override ~/.config/featuremap/config.toml.
# Credentials belong in ANTHROPIC_API_KEY or ANTHROPIC_AUTH_TOKEN.

[llm]
model = "claude-3-7-sonnet-20250219"
base_url = "https://api.anthropic.com"
timeout_secs = 300

[pipeline]
concurrency = 5
prefilter_chunk_size = 1000
max_agent_turns = 5
prefilter_max_retries = 2
extraction_max_retries = 3

[scan]
# Extra ignore patterns (gitignore syntax)
exclude = []
"#
        .to_string()
    }
}

/// Overrides from the environment names the service tooling already uses.
///
/// Empty values count as unset. `CLAUDE_CODE_SUBAGENT_MODEL` wins over
/// `ANTHROPIC_MODEL`.
fn service_env_overrides(lookup: &impl Fn(&str) -> Option<String>) -> Result<Value> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let mut llm = Map::new();
    if let Some(key) = get("ANTHROPIC_API_KEY") {
        llm.insert("api_key".into(), json!(key));
    }
    if let Some(token) = get("ANTHROPIC_AUTH_TOKEN") {
        llm.insert("auth_token".into(), json!(token));
    }
    if let Some(base_url) = get("ANTHROPIC_BASE_URL") {
        llm.insert("base_url".into(), json!(base_url));
    }
    if let Some(model) = get("CLAUDE_CODE_SUBAGENT_MODEL").or_else(|| get("ANTHROPIC_MODEL")) {
        llm.insert("model".into(), json!(model));
    }

    let mut pipeline = Map::new();
    if let Some(limit) = get("CONCURRENCY_LIMIT") {
        let limit: usize = limit.trim().parse().map_err(|_| {
            FeatureMapError::Config(format!(
                "CONCURRENCY_LIMIT must be a positive integer, got '{}'",
                limit
            ))
        })?;
        pipeline.insert("concurrency".into(), json!(limit));
    }

    let mut root = Map::new();
    if !llm.is_empty() {
        root.insert("llm".into(), Value::Object(llm));
    }
    if !pipeline.is_empty() {
        root.insert("pipeline".into(), Value::Object(pipeline));
    }
    Ok(Value::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_load_defaults() {
        let temp = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_from(None, &temp.path().join("missing.toml"), env_of(&[])).unwrap();
        assert_eq!(config.pipeline.concurrency, 5);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = temp.path().join("global.toml");
        let project = temp.path().join("project.toml");
        fs::write(&global, "[pipeline]\nconcurrency = 8\nmax_agent_turns = 3\n").unwrap();
        fs::write(&project, "[pipeline]\nconcurrency = 2\n").unwrap();

        let config = ConfigLoader::load_from(Some(&global), &project, env_of(&[])).unwrap();
        assert_eq!(config.pipeline.concurrency, 2);
        assert_eq!(config.pipeline.max_agent_turns, 3);
    }

    #[test]
    fn test_service_env_names() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(
            None,
            &temp.path().join("missing.toml"),
            env_of(&[
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("ANTHROPIC_BASE_URL", "https://proxy.internal"),
                ("ANTHROPIC_MODEL", "model-a"),
                ("CLAUDE_CODE_SUBAGENT_MODEL", "model-b"),
                ("CONCURRENCY_LIMIT", "9"),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.base_url, "https://proxy.internal");
        assert_eq!(config.llm.model, "model-b");
        assert_eq!(config.pipeline.concurrency, 9);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(
            None,
            &temp.path().join("missing.toml"),
            env_of(&[("CLAUDE_CODE_SUBAGENT_MODEL", ""), ("ANTHROPIC_MODEL", "model-a")]),
        )
        .unwrap();
        assert_eq!(config.llm.model, "model-a");
    }

    #[test]
    fn test_bad_concurrency_limit() {
        let temp = TempDir::new().unwrap();
        let result = ConfigLoader::load_from(
            None,
            &temp.path().join("missing.toml"),
            env_of(&[("CONCURRENCY_LIMIT", "lots")]),
        );
        assert!(matches!(result, Err(FeatureMapError::Config(_))));

        let result = ConfigLoader::load_from(
            None,
            &temp.path().join("missing.toml"),
            env_of(&[("CONCURRENCY_LIMIT", "0")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_write_default_is_loadable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        ConfigLoader::write_default(&path, false).unwrap();
        assert!(path.exists());

        let config = ConfigLoader::load_from(None, &path, env_of(&[])).unwrap();
        assert_eq!(config.pipeline.prefilter_chunk_size, 1000);
    }
}
