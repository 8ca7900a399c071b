//! Message and Transcript domain types.
//!
//! These are the value objects that flow through a request:
//! HTTP request → seeded Transcript → model replies and tool results appended → final answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a transcript (one per request).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranscriptId(pub String);

impl TranscriptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TranscriptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TranscriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (retrieval policy, persona)
    System,
    /// The end user
    User,
    /// The chat model
    Assistant,
    /// Tool execution result
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A request from the model to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as emitted by the model. Normally a JSON object; when the
    /// model produced text that is not valid JSON, the raw text is kept as a
    /// JSON string so the invoker can reject it.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from the wire form, where arguments arrive as a JSON string.
    pub fn from_raw_arguments(id: impl Into<String>, name: impl Into<String>, raw: &str) -> Self {
        let arguments = if raw.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
        };
        Self::new(id, name, arguments)
    }

    /// Arguments serialized back to the JSON text the model API expects.
    pub fn arguments_json(&self) -> String {
        match &self.arguments {
            serde_json::Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Classification of a per-call tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    ToolNotFound,
    InvalidArguments,
    ToolExecutionFailed,
}

/// Success value or error description of one tool call; never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { value: serde_json::Value },
    Error { kind: ToolErrorKind, message: String },
}

/// The outcome of a tool call, correlated back to its request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call: ToolCall,
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn success(call: ToolCall, value: serde_json::Value) -> Self {
        Self {
            call,
            outcome: ToolOutcome::Success { value },
        }
    }

    pub fn failure(call: ToolCall, kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            call,
            outcome: ToolOutcome::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call.id
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    /// The text handed back to the model for this result.
    pub fn output_text(&self) -> String {
        match &self.outcome {
            ToolOutcome::Success { value: serde_json::Value::String(s) } => s.clone(),
            ToolOutcome::Success { value } => value.to_string(),
            ToolOutcome::Error { message, .. } => format!("Error: {message}"),
        }
    }
}

/// A single turn in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content (may be empty for tool-calling assistant turns)
    pub content: String,

    /// Tool calls requested by the assistant, in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Present exactly on tool messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_result: Option<ToolCallResult>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_result: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant message that requests tool calls.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content.into());
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool message carrying one result.
    pub fn tool_result(result: ToolCallResult) -> Self {
        let mut msg = Self::with_role(Role::Tool, result.output_text());
        msg.tool_call_result = Some(result);
        msg
    }

    /// Build a message from a role and text, as received from an API client.
    pub fn from_role(role: Role, content: impl Into<String>) -> Self {
        Self::with_role(role, content.into())
    }

    /// The correlation id of the call this tool message answers.
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_result.as_ref().map(|r| r.call_id())
    }
}

/// The ordered, append-only message history of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: TranscriptId,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    /// Create a new empty transcript.
    pub fn new() -> Self {
        Self {
            id: TranscriptId::new(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Seed a transcript as `[system, ...messages]`.
    pub fn seeded(system_prompt: impl Into<String>, messages: impl IntoIterator<Item = Message>) -> Self {
        let mut transcript = Self::new();
        transcript.push(Message::system(system_prompt));
        for msg in messages {
            transcript.push(msg);
        }
        transcript
    }

    /// Append a message. Messages are never edited or removed afterwards.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Every tool result recorded so far, in transcript order.
    pub fn tool_results(&self) -> impl Iterator<Item = &ToolCallResult> {
        self.messages.iter().filter_map(|m| m.tool_call_result.as_ref())
    }

    /// Check the correlation invariant: each tool message carries exactly one
    /// result whose call id belongs to the assistant message that opened the
    /// current run of tool messages.
    pub fn is_well_formed(&self) -> bool {
        let mut open_calls: Option<&[ToolCall]> = None;
        for msg in &self.messages {
            match msg.role {
                Role::Assistant => open_calls = Some(&msg.tool_calls),
                Role::Tool => {
                    let Some(result) = &msg.tool_call_result else {
                        return false;
                    };
                    let Some(calls) = open_calls else {
                        return false;
                    };
                    if !calls.iter().any(|c| c.id == result.call.id) {
                        return false;
                    }
                }
                Role::System | Role::User => {
                    if msg.tool_call_result.is_some() {
                        return false;
                    }
                    open_calls = None;
                }
            }
        }
        true
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
