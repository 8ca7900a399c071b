//! The agent reasoning loop implementation.

use std::sync::Arc;
use ragent_config::AppConfig;
use ragent_core::error::{Error, ProviderError};
use ragent_core::message::{Message, ToolCall, Transcript};
use ragent_core::provider::{Provider, ProviderRequest, Usage};
use ragent_core::tool::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::invoker::ToolInvoker;
use crate::sink::EventSink;
use crate::stream_event::AgentStreamEvent;

/// Appended to the answer when the iteration guard stops the loop.
pub const TRUNCATION_NOTICE: &str =
    "[Stopped: the maximum number of reasoning steps was reached before a final answer.]";

/// Where the loop is between model calls and tool dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    DispatchingTools,
    Done,
}

/// Why the loop reached `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model replied without tool calls.
    Completed,
    /// The iteration guard fired while the model still wanted tools.
    MaxIterations,
}

/// Result of one finished run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    pub transcript: Transcript,
    /// Number of model calls made
    pub iterations: usize,
    pub tool_calls_made: usize,
    pub stop_reason: StopReason,
    /// Summed over every model call
    pub usage: Usage,
}

impl AgentOutcome {
    pub fn truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxIterations
    }
}

/// One model reply, assembled from either a complete response or a stream.
#[derive(Debug, Default)]
struct ModelReply {
    content: String,
    tool_calls: Vec<ToolCall>,
    usage: Option<Usage>,
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,

    model: String,

    temperature: f32,

    /// Default max tokens per model response
    max_tokens: Option<u32>,

    tools: Arc<ToolRegistry>,

    system_prompt: String,

    /// Upper bound on model calls per request
    max_iterations: usize,

    /// Run the calls of one assistant turn concurrently
    parallel_tool_calls: bool,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            system_prompt: ragent_config::default_system_prompt(),
            max_iterations: 25,
            parallel_tool_calls: false,
        }
    }

    /// Create a loop from the `[agent]` section and model defaults of a config.
    pub fn configured(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, config: &AppConfig) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());
        Self::new(provider, model, tools)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_system_prompt(config.agent.system_prompt.clone())
            .with_max_iterations(config.agent.max_iterations)
            .with_parallel_tool_calls(config.agent.parallel_tool_calls)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the maximum number of model calls per request (at least one).
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Start a transcript: the system prompt followed by the given messages.
    pub fn seed(&self, messages: impl IntoIterator<Item = Message>) -> Transcript {
        Transcript::seeded(self.system_prompt.clone(), messages)
    }

    /// Run the loop to completion without streaming.
    pub async fn process(&self, transcript: Transcript) -> Result<AgentOutcome, Error> {
        self.run(transcript, None, &CancellationToken::new()).await
    }

    /// Run the loop to completion.
    ///
    /// With a sink, model output is streamed fragment by fragment and tool
    /// dispatch is reported as it happens. Cancelling the token ends the run
    /// with [`Error::Cancelled`].
    pub async fn run(
        &self,
        mut transcript: Transcript,
        sink: Option<&EventSink>,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome, Error> {
        info!(
            transcript_id = %transcript.id,
            messages = transcript.len(),
            streaming = sink.is_some(),
            "Processing transcript"
        );

        let definitions = self.tools.definitions();
        let invoker = ToolInvoker::new(&self.tools, self.parallel_tool_calls);

        let mut state = LoopState::AwaitingModel;
        let mut stop_reason = StopReason::Completed;
        let mut iterations = 0;
        let mut tool_calls_made = 0;
        let mut usage = Usage::default();
        let mut best_partial = String::new();
        let mut answer = String::new();

        while state != LoopState::Done {
            if cancel.is_cancelled() {
                info!(transcript_id = %transcript.id, "Agent loop cancelled");
                return Err(Error::Cancelled);
            }

            state = match state {
                LoopState::AwaitingModel => {
                    iterations += 1;
                    debug!(transcript_id = %transcript.id, iteration = iterations, "Agent loop iteration");

                    let request = ProviderRequest {
                        model: self.model.clone(),
                        messages: transcript.messages().to_vec(),
                        temperature: self.temperature,
                        max_tokens: self.max_tokens,
                        tools: definitions.clone(),
                        stream: sink.is_some(),
                    };

                    let reply = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            info!(transcript_id = %transcript.id, "Agent loop cancelled during model call");
                            return Err(Error::Cancelled);
                        }
                        reply = self.call_model(request, sink) => reply?,
                    };

                    if let Some(u) = &reply.usage {
                        usage.accumulate(u);
                    }
                    if !reply.content.trim().is_empty() {
                        best_partial = reply.content.clone();
                    }

                    let wants_tools = !reply.tool_calls.is_empty();
                    let content = reply.content.clone();
                    transcript.push(Message::assistant_with_tools(reply.content, reply.tool_calls));

                    if !wants_tools {
                        answer = content;
                        LoopState::Done
                    } else if iterations >= self.max_iterations {
                        warn!(
                            transcript_id = %transcript.id,
                            iterations,
                            "Max iterations reached, stopping without dispatching tools"
                        );
                        stop_reason = StopReason::MaxIterations;
                        answer = truncated_answer(&best_partial);
                        if let Some(sink) = sink {
                            sink.push(AgentStreamEvent::Chunk {
                                content: format!("\n\n{TRUNCATION_NOTICE}"),
                            });
                        }
                        LoopState::Done
                    } else {
                        LoopState::DispatchingTools
                    }
                }
                LoopState::DispatchingTools => {
                    tool_calls_made += invoker.dispatch(&mut transcript, sink).await;
                    LoopState::AwaitingModel
                }
                LoopState::Done => LoopState::Done,
            };
        }

        info!(
            transcript_id = %transcript.id,
            iterations,
            tool_calls_made,
            truncated = stop_reason == StopReason::MaxIterations,
            "Agent loop finished"
        );

        Ok(AgentOutcome {
            answer,
            transcript,
            iterations,
            tool_calls_made,
            stop_reason,
            usage,
        })
    }

    /// One model call. With a sink the reply is streamed and each content
    /// fragment is forwarded as it arrives.
    async fn call_model(&self, request: ProviderRequest, sink: Option<&EventSink>) -> Result<ModelReply, ProviderError> {
        let Some(sink) = sink else {
            let response = self.provider.complete(request).await?;
            return Ok(ModelReply {
                content: response.message.content,
                tool_calls: response.message.tool_calls,
                usage: response.usage,
            });
        };

        let mut rx = self.provider.stream(request).await?;
        let mut reply = ModelReply::default();
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                if !sink.push(AgentStreamEvent::Chunk { content: text.clone() }) {
                    debug!("Stream consumer detached");
                }
                reply.content.push_str(&text);
            }
            reply.tool_calls.extend(chunk.tool_calls);
            if chunk.usage.is_some() {
                reply.usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }
        Ok(reply)
    }
}

fn truncated_answer(best_partial: &str) -> String {
    if best_partial.trim().is_empty() {
        TRUNCATION_NOTICE.to_string()
    } else {
        format!("{best_partial}\n\n{TRUNCATION_NOTICE}")
    }
}
