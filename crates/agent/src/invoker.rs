//! Tool dispatch for one assistant turn.

use futures::future::join_all;
use ragent_core::message::{Message, Role, ToolCall, ToolCallResult, ToolOutcome, Transcript};
use ragent_core::tool::ToolRegistry;
use tracing::{info, warn};
use crate::sink::EventSink;
use crate::stream_event::AgentStreamEvent;

/// Executes the tool calls of the latest assistant message and appends one
/// tool message per call, in request order.
pub struct ToolInvoker<'a> {
    registry: &'a ToolRegistry,
    parallel: bool,
}

impl<'a> ToolInvoker<'a> {
    pub fn new(registry: &'a ToolRegistry, parallel: bool) -> Self {
        Self { registry, parallel }
    }

    /// Run every pending call and return how many were executed.
    pub async fn dispatch(&self, transcript: &mut Transcript, sink: Option<&EventSink>) -> usize {
        let calls = match transcript.last() {
            Some(msg) if msg.role == Role::Assistant => msg.tool_calls.clone(),
            _ => return 0,
        };

        let results = if self.parallel {
            join_all(calls.into_iter().map(|call| self.invoke_one(call, sink))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.invoke_one(call, sink).await);
            }
            results
        };

        let count = results.len();
        for result in results {
            transcript.push(Message::tool_result(result));
        }
        count
    }

    async fn invoke_one(&self, call: ToolCall, sink: Option<&EventSink>) -> ToolCallResult {
        info!(tool = %call.name, id = %call.id, "Invoking tool");
        if let Some(sink) = sink {
            sink.push(AgentStreamEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            });
        }

        let result = self.registry.call(call).await;

        if let ToolOutcome::Error { kind, message } = &result.outcome {
            warn!(tool = %result.call.name, ?kind, error = %message, "Tool call failed");
        }
        if let Some(sink) = sink {
            sink.push(AgentStreamEvent::ToolResult {
                id: result.call.id.clone(),
                name: result.call.name.clone(),
                arguments: result.call.arguments.clone(),
                output: result.output_text(),
                success: result.is_success(),
            });
        }
        result
    }
}
