//! Reasoning Service Abstraction
//!
//! Defines the `ReasoningClient` trait the pipeline talks to. A client takes a
//! role-tagged conversation (plus optional tool definitions) and answers with
//! either final text or a batch of tool calls.

mod anthropic;
mod types;

pub use anthropic::AnthropicClient;
pub use types::{
    ChatMessage, ContentBlock, ModelReply, ModelRequest, ModelResponse, Role, TokenUsage,
    ToolCall, ToolDefinition,
};

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{FeatureMapError, Result};

// =============================================================================
// Client Trait
// =============================================================================

#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Send one request and return the model's reply with token usage.
    ///
    /// Errors carry an [`ErrorCategory`] so callers can decide whether to retry.
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

pub type SharedClient = Arc<dyn ReasoningClient>;

// =============================================================================
// Client Configuration
// =============================================================================

/// Connection settings for a reasoning client
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: Option<SecretString>,
    pub auth_token: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    pub fn from_llm_config(config: &LlmConfig) -> Self {
        Self {
            api_key: non_empty(config.api_key.as_deref()).map(SecretString::from),
            auth_token: non_empty(config.auth_token.as_deref()).map(SecretString::from),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() || self.auth_token.is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Build the configured client.
///
/// Fails with [`FeatureMapError::MissingCredentials`] when neither an API key
/// nor an auth token is available.
pub fn create_client(config: &LlmConfig) -> Result<SharedClient> {
    let client_config = ClientConfig::from_llm_config(config);
    if !client_config.has_credentials() {
        return Err(FeatureMapError::MissingCredentials);
    }
    Ok(Arc::new(AnthropicClient::new(client_config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config() -> LlmConfig {
        LlmConfig::default()
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let config = llm_config();
        let result = create_client(&config);
        assert!(matches!(result, Err(FeatureMapError::MissingCredentials)));
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        let mut config = llm_config();
        config.api_key = Some("   ".into());
        assert!(!ClientConfig::from_llm_config(&config).has_credentials());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = llm_config();
        config.auth_token = Some("sk-secret-token".into());
        let client_config = ClientConfig::from_llm_config(&config);
        let rendered = format!("{:?}", client_config);
        assert!(!rendered.contains("sk-secret-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_create_client_with_token() {
        let mut config = llm_config();
        config.api_key = Some("sk-test".into());
        let client = create_client(&config).unwrap();
        assert_eq!(client.name(), "anthropic");
        assert_eq!(client.model(), config.model);
    }
}
