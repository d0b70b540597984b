//! AI Integration Layer
//!
//! Reasoning-service client, retry policy, usage metrics and model output
//! validation.

pub mod metrics;
pub mod provider;
pub mod retry;
pub mod validation;

pub use metrics::{MetricsCollector, MetricsSummary, SharedMetrics};
pub use provider::{
    AnthropicClient, ChatMessage, ClientConfig, ContentBlock, ModelReply, ModelRequest,
    ModelResponse, ReasoningClient, Role, SharedClient, TokenUsage, ToolCall, ToolDefinition,
    create_client,
};
pub use retry::RetryPolicy;
pub use validation::{parse_string_array, strip_code_fences};
