//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Classifies reasoning-service failures so the retry policy can decide
//! between backing off, retrying immediately, and failing the unit.
//!
//! ## Error Categories
//!
//! - **RateLimit**: Service throttling (exponential backoff, bounded)
//! - **ParseError**: Structured output did not parse (immediate retry where allowed)
//! - **Auth**: Credentials rejected (fail fast)
//! - **Network**: Connectivity issues and request timeouts (fail the unit)
//! - **Transient**: Server-side hiccups (fail the unit)

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Context/token limit exceeded
    TokenLimit,
    /// Authentication failed - fail fast
    Auth,
    /// Network/connectivity issues, including request timeouts
    Network,
    /// Endpoint or model not available
    Unavailable,
    /// Invalid request - fix the request
    BadRequest,
    /// Service output could not be parsed
    ParseError,
    /// Temporary server issues
    Transient,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether failures of this category warrant a delayed retry
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimit)
    }

    /// Whether the service answered but its output was unusable
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::ParseError)
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Reasoning-service error with category, context, and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before retry (from `retry-after`, if sent)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Malformed structured output
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ParseError, message)
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps transport failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an error message
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();

        if lower.contains("rate limit")
            || lower.contains("rate_limit")
            || lower.contains("429")
            || lower.contains("too many requests")
        {
            return LlmError::with_provider(ErrorCategory::RateLimit, message, provider);
        }

        if lower.contains("prompt is too long")
            || lower.contains("context length")
            || lower.contains("too large")
        {
            return LlmError::with_provider(ErrorCategory::TokenLimit, message, provider);
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("authentication")
            || lower.contains("permission")
        {
            return LlmError::with_provider(ErrorCategory::Auth, message, provider);
        }

        if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("timeout")
            || lower.contains("timed out")
            || lower.contains("unreachable")
        {
            return LlmError::with_provider(ErrorCategory::Network, message, provider);
        }

        if lower.contains("overloaded") || lower.contains("temporar") {
            return LlmError::with_provider(ErrorCategory::Transient, message, provider);
        }

        if lower.contains("parse") || lower.contains("json") || lower.contains("expected value")
        {
            return LlmError::with_provider(ErrorCategory::ParseError, message, provider);
        }

        LlmError::with_provider(ErrorCategory::Unknown, message, provider)
    }

    /// Classify an HTTP status code (more accurate than string matching)
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 413 | 422 => {
                if message.to_lowercase().contains("prompt is too long") {
                    LlmError::with_provider(ErrorCategory::TokenLimit, message, provider)
                } else {
                    LlmError::with_provider(ErrorCategory::BadRequest, message, provider)
                }
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            // 529 is the service's "overloaded" status
            500 | 502 | 503 | 504 | 529 => {
                LlmError::with_provider(ErrorCategory::Transient, message, provider)
            }
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum FeatureMapError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Reasoning Service Errors
    // -------------------------------------------------------------------------
    /// Structured service error with category and retry hints
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error(
        "Missing credentials: set ANTHROPIC_API_KEY or ANTHROPIC_AUTH_TOKEN (or llm.api_key in config)"
    )]
    MissingCredentials,

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// Stage-level failure that aborts the run
    #[error("Pipeline error in {stage_name}: {message}")]
    Pipeline {
        stage: u8,
        stage_name: String,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<LlmError> for FeatureMapError {
    fn from(err: LlmError) -> Self {
        FeatureMapError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, FeatureMapError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl FeatureMapError {
    /// Create a stage-level pipeline error
    pub fn pipeline(stage: u8, stage_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage,
            stage_name: stage_name.into(),
            message: message.into(),
        }
    }

    /// Category used by the retry policy. Only service errors carry one.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category,
            Self::MissingCredentials => ErrorCategory::Auth,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Server-suggested wait time, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Llm(e) => e.retry_after,
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
