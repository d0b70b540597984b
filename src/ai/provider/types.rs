//! Conversation and tool types shared by every reasoning client.
//!
//! Content blocks serialize in the Messages API wire shape, so a conversation
//! can be sent as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content,
        }
    }

    pub fn assistant_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

/// Tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool input
    pub input_schema: Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// A single request to the reasoning service.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// What the model answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Final text answer
    Text(String),
    /// Request to run tools; `blocks` is the full assistant content to echo back
    ToolUse {
        blocks: Vec<ContentBlock>,
        calls: Vec<ToolCall>,
    },
}

impl ModelReply {
    /// Build a reply from raw assistant content.
    ///
    /// Any tool-use block makes the reply a tool request; otherwise the text
    /// blocks are concatenated.
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        let calls: Vec<ToolCall> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect();

        if calls.is_empty() {
            let text = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<String>();
            Self::Text(text)
        } else {
            Self::ToolUse { blocks, calls }
        }
    }

    /// Text of a final answer, `None` for tool requests.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::ToolUse { .. } => None,
        }
    }
}

/// Token usage reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub reply: ModelReply,
    pub usage: TokenUsage,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            reply: ModelReply::Text(text.into()),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::tool_error("tu_1", "Error: missing");
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "tu_1", "content": "Error: missing", "is_error": true})
        );

        let ok = ContentBlock::tool_result("tu_2", "fn main() {}");
        let value = serde_json::to_value(&ok).unwrap();
        assert!(value.get("is_error").is_none());

        let msg = ChatMessage::user("hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "user", "content": [{"type": "text", "text": "hi"}]})
        );
    }

    #[test]
    fn test_reply_from_blocks() {
        let reply = ModelReply::from_blocks(vec![
            ContentBlock::text("Let me look."),
            ContentBlock::ToolUse {
                id: "tu_1".into(),
                name: "view_file".into(),
                input: json!({"reason": "need body"}),
            },
        ]);
        match reply {
            ModelReply::ToolUse { blocks, calls } => {
                assert_eq!(blocks.len(), 2);
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "view_file");
            }
            other => panic!("expected tool use, got {other:?}"),
        }

        let text = ModelReply::from_blocks(vec![ContentBlock::text("done")]);
        assert_eq!(text.text(), Some("done"));

        let empty = ModelReply::from_blocks(Vec::new());
        assert_eq!(empty.text(), Some(""));
    }
}
