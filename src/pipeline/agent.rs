//! Agentic Extraction Loop
//!
//! A turn-bounded conversation per file. The model sees the structural
//! footprint and may call `view_file` to read the full source before
//! answering.
//!
//! ## State Machine
//!
//! ```text
//! AwaitingModel ──text──────────→ Finalized
//!      │  ↑
//!  tool_use  tool results sent
//!      ↓  │
//! ToolRequested ──turns spent──→ Exhausted
//! ```
//!
//! Transitions are pure over an immutable [`Conversation`]; only the model
//! call and the file read perform I/O.

use std::path::Path;

use tracing::{debug, warn};

use super::prompts::{self, VIEW_FILE_TOOL};
use crate::ai::{
    ChatMessage, ContentBlock, ModelReply, ModelRequest, RetryPolicy, SharedClient,
    SharedMetrics, ToolCall,
};
use crate::constants::request;
use crate::types::{Result, StructuralFootprint};

/// Message history plus the number of model turns taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    turns: u32,
}

impl Conversation {
    pub fn start(opening: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(opening)],
            turns: 0,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    fn with_message(&self, message: ChatMessage) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        Self {
            messages,
            turns: self.turns,
        }
    }

    fn next_turn(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            turns: self.turns + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    AwaitingModel,
    ToolRequested(Vec<ToolCall>),
    Finalized(String),
    Exhausted,
}

/// How a loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Finalized(String),
    Exhausted,
}

/// Apply a model reply. `conversation` must already count the turn that
/// produced `reply`.
pub fn on_reply(
    conversation: &Conversation,
    reply: ModelReply,
    max_turns: u32,
) -> (Conversation, AgentState) {
    match reply {
        ModelReply::Text(text) => (conversation.clone(), AgentState::Finalized(text)),
        ModelReply::ToolUse { .. } if conversation.turns >= max_turns => {
            (conversation.clone(), AgentState::Exhausted)
        }
        ModelReply::ToolUse { blocks, calls } => (
            conversation.with_message(ChatMessage::assistant_blocks(blocks)),
            AgentState::ToolRequested(calls),
        ),
    }
}

/// Append all tool results as one user message.
pub fn on_tool_results(
    conversation: &Conversation,
    results: Vec<ContentBlock>,
) -> (Conversation, AgentState) {
    (
        conversation.with_message(ChatMessage::user_blocks(results)),
        AgentState::AwaitingModel,
    )
}

/// Runs the loop for one file.
pub struct ExtractionAgent {
    client: SharedClient,
    retry: RetryPolicy,
    metrics: SharedMetrics,
    max_turns: u32,
}

impl ExtractionAgent {
    pub fn new(
        client: SharedClient,
        retry: RetryPolicy,
        metrics: SharedMetrics,
        max_turns: u32,
    ) -> Self {
        Self {
            client,
            retry,
            metrics,
            max_turns,
        }
    }

    /// Describe the file behind `footprint`; `source` is its absolute path.
    pub async fn run(
        &self,
        footprint: &StructuralFootprint,
        source: impl AsRef<Path>,
    ) -> Result<AgentOutcome> {
        let source = source.as_ref();
        let mut conversation = Conversation::start(prompts::file_prompt(footprint)?);
        let mut state = AgentState::AwaitingModel;

        loop {
            state = match state {
                AgentState::AwaitingModel => {
                    let request = self.request_for(&conversation);
                    let response = self
                        .retry
                        .run(&footprint.path, || self.client.complete(&request))
                        .await?;
                    self.metrics.record_usage(&response.usage);

                    let (next, state) =
                        on_reply(&conversation.next_turn(), response.reply, self.max_turns);
                    conversation = next;
                    state
                }
                AgentState::ToolRequested(calls) => {
                    debug!(
                        file = %footprint.path,
                        turn = conversation.turns(),
                        calls = calls.len(),
                        "Answering tool calls"
                    );
                    let mut results = Vec::with_capacity(calls.len());
                    for call in &calls {
                        results.push(answer_tool_call(call, source).await);
                    }
                    let (next, state) = on_tool_results(&conversation, results);
                    conversation = next;
                    state
                }
                AgentState::Finalized(text) => return Ok(AgentOutcome::Finalized(text)),
                AgentState::Exhausted => {
                    warn!(
                        file = %footprint.path,
                        turns = conversation.turns(),
                        "Agent did not finish within the turn limit"
                    );
                    return Ok(AgentOutcome::Exhausted);
                }
            };
        }
    }

    fn request_for(&self, conversation: &Conversation) -> ModelRequest {
        ModelRequest::new(conversation.messages().to_vec())
            .with_system(prompts::FILE_SYSTEM)
            .with_tools(vec![prompts::view_file_tool()])
            .with_max_tokens(request::FILE_MAX_TOKENS)
            .with_temperature(request::SYNTHESIS_TEMPERATURE)
    }
}

async fn answer_tool_call(call: &ToolCall, source: &Path) -> ContentBlock {
    if call.name != VIEW_FILE_TOOL {
        return ContentBlock::tool_error(&call.id, format!("Error: Unknown tool '{}'", call.name));
    }
    match tokio::fs::read_to_string(source).await {
        Ok(content) => ContentBlock::tool_result(&call.id, content),
        Err(e) => ContentBlock::tool_error(&call.id, format!("Error: {}", e)),
    }
}
