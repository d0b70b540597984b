//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/featuremap/) and project (.featuremap/) level configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{llm, pipeline, retry};
use crate::types::{FeatureMapError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reasoning service settings
    pub llm: LlmConfig,

    /// Stage tuning
    pub pipeline: PipelineConfig,

    /// File inventory settings
    pub scan: ScanConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `FeatureMapError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(FeatureMapError::Config(
                "llm.model must not be empty".to_string(),
            ));
        }

        url::Url::parse(&self.llm.base_url).map_err(|e| {
            FeatureMapError::Config(format!(
                "llm.base_url is not a valid URL ({}): {}",
                self.llm.base_url, e
            ))
        })?;

        if self.llm.timeout_secs == 0 {
            return Err(FeatureMapError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.concurrency == 0 {
            return Err(FeatureMapError::Config(
                "pipeline.concurrency must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.prefilter_chunk_size == 0 {
            return Err(FeatureMapError::Config(
                "pipeline.prefilter_chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_agent_turns == 0 {
            return Err(FeatureMapError::Config(
                "pipeline.max_agent_turns must be greater than 0".to_string(),
            ));
        }

        for pattern in &self.scan.exclude {
            let body = pattern.trim().trim_start_matches('!');
            glob::Pattern::new(body).map_err(|e| {
                FeatureMapError::Config(format!(
                    "scan.exclude pattern '{}' is invalid: {}",
                    pattern, e
                ))
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model name sent with every request
    pub model: String,

    /// API base URL (without the `/v1/messages` path)
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// API key, sent as `x-api-key`. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Bearer token, used when no API key is set. Never written back out.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: llm::DEFAULT_MODEL.to_string(),
            base_url: llm::DEFAULT_BASE_URL.to_string(),
            timeout_secs: llm::DEFAULT_TIMEOUT_SECS,
            api_key: None,
            auth_token: None,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum reasoning calls in flight
    pub concurrency: usize,

    /// Files per Stage 0 request
    pub prefilter_chunk_size: usize,

    /// Turn cap for the per-file agent
    pub max_agent_turns: u32,

    /// Retry bound for Stage 0 chunks
    pub prefilter_max_retries: u32,

    /// Retry bound for Stage 1-3 calls
    pub extraction_max_retries: u32,

    pub retry_base_delay_ms: u64,
    pub retry_max_jitter_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: pipeline::DEFAULT_CONCURRENCY,
            prefilter_chunk_size: pipeline::PREFILTER_CHUNK_SIZE,
            max_agent_turns: pipeline::MAX_AGENT_TURNS,
            prefilter_max_retries: retry::PREFILTER_MAX_RETRIES,
            extraction_max_retries: retry::EXTRACTION_MAX_RETRIES,
            retry_base_delay_ms: retry::BASE_DELAY_MS,
            retry_max_jitter_ms: retry::MAX_JITTER_MS,
            retry_max_delay_ms: retry::MAX_DELAY_MS,
        }
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Extra ignore patterns (gitignore syntax), added to the built-in list
    pub exclude: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.concurrency, 5);
        assert_eq!(config.pipeline.prefilter_chunk_size, 1000);
        assert_eq!(config.pipeline.max_agent_turns, 5);
        assert_eq!(config.llm.model, "claude-3-7-sonnet-20250219");
    }

    #[test]
    fn test_validate_rejects_zeros() {
        let mut config = Config::default();
        config.pipeline.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.prefilter_chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.max_agent_turns = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.llm.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_exclude_patterns() {
        let mut config = Config::default();
        config.scan.exclude = vec!["*.log".into(), "build/".into(), "!keep.log".into()];
        assert!(config.validate().is_ok());

        config.scan.exclude = vec!["src/[abc".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-live-123".into());
        config.llm.auth_token = Some("tok-456".into());
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("sk-live-123"));
        assert!(!rendered.contains("tok-456"));
        assert!(rendered.contains("[pipeline]"));
    }
}
