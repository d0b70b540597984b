//! Anthropic Messages API client
//!
//! Sends conversations with optional tool definitions to `{base}/v1/messages`
//! and maps the response content blocks onto [`ModelReply`].

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{
    ChatMessage, ClientConfig, ContentBlock, ModelReply, ModelRequest, ModelResponse,
    ReasoningClient, TokenUsage, ToolDefinition,
};
use crate::constants::llm::{API_VERSION, PROVIDER_NAME};
use crate::types::{ErrorCategory, ErrorClassifier, FeatureMapError, LlmError, Result};

/// Messages API client with secure credential handling
pub struct AnthropicClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("config", &self.config)
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                LlmError::with_provider(
                    ErrorCategory::Unknown,
                    format!("Failed to create HTTP client: {}", e),
                    PROVIDER_NAME,
                )
            })?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    fn build_request<'a>(&'a self, request: &'a ModelRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: &request.messages,
            tools: &request.tools,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> FeatureMapError {
        if err.is_timeout() {
            return LlmError::with_provider(
                ErrorCategory::Network,
                format!(
                    "Request timed out after {}s",
                    self.config.timeout_secs
                ),
                PROVIDER_NAME,
            )
            .into();
        }
        ErrorClassifier::classify(&format!("Request failed: {}", err), PROVIDER_NAME).into()
    }
}

#[async_trait]
impl ReasoningClient for AnthropicClient {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let start_time = Instant::now();
        let body = self.build_request(request);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json");

        builder = if let Some(key) = &self.config.api_key {
            builder.header("x-api-key", key.expose_secret())
        } else if let Some(token) = &self.config.auth_token {
            builder.bearer_auth(token.expose_secret())
        } else {
            return Err(FeatureMapError::MissingCredentials);
        };

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            let mut err = ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("API error ({}): {}", status, text),
                PROVIDER_NAME,
            );
            if let Some(delay) = retry_after {
                err = err.retry_after(delay);
            }
            return Err(err.into());
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            LlmError::with_provider(
                ErrorCategory::ParseError,
                format!("Failed to parse API response: {}", e),
                PROVIDER_NAME,
            )
        })?;

        debug!(
            model = %self.config.model,
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("none"),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Received response"
        );

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        let blocks = parsed
            .content
            .into_iter()
            .filter_map(ResponseBlock::into_content)
            .collect();

        Ok(ModelResponse {
            reply: ModelReply::from_blocks(blocks),
            usage,
        })
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl ResponseBlock {
    fn into_content(self) -> Option<ContentBlock> {
        match self {
            Self::Text { text } => Some(ContentBlock::Text { text }),
            Self::ToolUse { id, name, input } => Some(ContentBlock::ToolUse { id, name, input }),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
