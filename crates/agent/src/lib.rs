//! The tool-calling agent loop.
//!
//! The agent follows an **act → observe** cycle:
//!
//! 1. **Seed** a transcript with the system prompt and the client's messages
//! 2. **Call the model** with the transcript and the tool schemas
//! 3. **If tool calls**: run them, append one result per call, go to step 2
//! 4. **If text**: that text is the final answer
//!
//! A hard iteration guard stops the loop when the model keeps asking for
//! tools. With an [`EventSink`] the run is streamed as [`AgentStreamEvent`]s.

pub mod invoker;
pub mod loop_runner;
pub mod render;
pub mod sink;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use invoker::ToolInvoker;
pub use loop_runner::{AgentLoop, AgentOutcome, LoopState, StopReason, TRUNCATION_NOTICE};
pub use render::{render_report, render_tool_summary};
pub use sink::{AgentEventStream, EventSink, spawn_agent_stream};
pub use stream_event::AgentStreamEvent;
