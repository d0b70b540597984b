//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Reasoning service defaults
pub mod llm {
    /// Model used when neither config nor environment names one
    pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

    /// Default API base URL
    pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

    /// Value of the `anthropic-version` header
    pub const API_VERSION: &str = "2023-06-01";

    /// Per-request HTTP timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Provider label used in logs and errors
    pub const PROVIDER_NAME: &str = "anthropic";
}

/// Capped exponential backoff for rate-limited calls
pub mod retry {
    /// Backoff base: delay before attempt k is `2^k * BASE_DELAY_MS`
    pub const BASE_DELAY_MS: u64 = 2000;

    /// Upper bound of the uniform jitter added to each delay
    pub const MAX_JITTER_MS: u64 = 1000;

    /// Hard cap on any single delay
    pub const MAX_DELAY_MS: u64 = 30_000;

    /// Retry bound for Stage 0 chunk calls
    pub const PREFILTER_MAX_RETRIES: u32 = 2;

    /// Retry bound for extraction and synthesis calls
    pub const EXTRACTION_MAX_RETRIES: u32 = 3;
}

/// Stage tuning
pub mod pipeline {
    /// Default executor concurrency
    pub const DEFAULT_CONCURRENCY: usize = 5;

    /// Files per Stage 0 request
    pub const PREFILTER_CHUNK_SIZE: usize = 1000;

    /// Turn cap for the per-file agent conversation
    pub const MAX_AGENT_TURNS: u32 = 5;

    /// Description recorded when the agent never produced a final answer
    pub const AGENT_EXHAUSTED_SENTINEL: &str = "Error: Agent looped too many times.";

    /// Cache key of the single Stage 3 unit
    pub const GLOBAL_UNIT_KEY: &str = "global";
}

/// Per-stage request parameters
pub mod request {
    pub const PREFILTER_MAX_TOKENS: u32 = 8000;
    pub const PREFILTER_TEMPERATURE: f32 = 0.1;

    pub const FILE_MAX_TOKENS: u32 = 1500;
    pub const COMPONENT_MAX_TOKENS: u32 = 2000;
    pub const GLOBAL_MAX_TOKENS: u32 = 2500;

    /// Temperature for Stage 1-3 calls
    pub const SYNTHESIS_TEMPERATURE: f32 = 0.2;
}

/// Cache file layout
pub mod cache {
    /// Schema version written into every cache record
    pub const RECORD_VERSION: u32 = 1;

    /// Cache file name prefix; the analyzed folder name and `.json` follow
    pub const FILE_PREFIX: &str = ".extract-cache-";

    /// Output document suffix appended to the analyzed folder name
    pub const OUTPUT_SUFFIX: &str = "-features.md";
}
