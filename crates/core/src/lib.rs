//! # ragent core
//!
//! Domain types, traits, and error definitions for the ragent tool-calling
//! agent. This crate has **no framework dependencies**: it defines the
//! transcript model, the chat-model capability and the tool registry that
//! every other crate builds against.
//!
//! ## Layout
//!
//! - [`message`]: roles, messages, tool calls and their results, transcripts
//! - [`provider`]: the chat-model client trait and its request/response types
//! - [`tool`]: the tool trait, parameter schemas, argument coercion, registry
//! - [`error`]: the error taxonomy shared by the loop and its collaborators

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use message::{
    Message, Role, ToolCall, ToolCallResult, ToolErrorKind, ToolOutcome, Transcript, TranscriptId,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition, Usage};
pub use tool::{ParameterKind, Tool, ToolArguments, ToolParameter, ToolRegistry};
