//! Agent-level streaming events.
//!
//! `AgentStreamEvent` lifts provider stream chunks and tool dispatch into
//! events the gateway can forward to clients over SSE.

use ragent_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted by the agent during streaming execution.
///
/// - `chunk`: partial text from the model
/// - `tool_call`: a tool call is about to run
/// - `tool_result`: a tool call finished
/// - `done`: the loop finished (terminal)
/// - `error`: the loop failed (terminal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text from the model.
    Chunk { content: String },

    /// The agent is calling a tool.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        arguments: serde_json::Value,
        output: String,
        success: bool,
    },

    /// The loop is complete.
    Done {
        iterations: usize,
        tool_calls_made: usize,
        truncated: bool,
        usage: Option<Usage>,
    },

    /// The loop failed or its task ended early.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
