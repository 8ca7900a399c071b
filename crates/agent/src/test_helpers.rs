//! Shared test helpers: scripted providers and tools with controllable behavior.

use async_trait::async_trait;
use ragent_core::error::{ProviderError, ToolError};
use ragent_core::message::{Message, ToolCall};
use ragent_core::provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
use ragent_core::tool::{ParameterKind, Tool, ToolArguments, ToolParameter};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

/// A provider that returns a sequence of scripted responses.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: ProviderRequest) -> ProviderResponse {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);
        match self.responses.get(index) {
            Some(response) => response.clone(),
            None => panic!(
                "ScriptedProvider: no more responses (call #{index}, have {})",
                self.responses.len()
            ),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(self.next(request))
    }

    /// Streams the scripted content word by word, then a final chunk with tool calls.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError> {
        let response = self.next(request);
        let pieces: Vec<String> = response
            .message
            .content
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();
        let (tx, rx) = tokio::sync::mpsc::channel(pieces.len() + 1);
        for piece in pieces {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(piece),
                    ..Default::default()
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                tool_calls: response.message.tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

/// A provider that requests a tool on every call.
pub struct AlwaysToolProvider {
    calls: Mutex<usize>,
}

impl AlwaysToolProvider {
    pub fn new() -> Self {
        Self { calls: Mutex::new(0) }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for AlwaysToolProvider {
    fn name(&self) -> &str {
        "always_tool"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let call = ToolCall::new(format!("call_{n}"), "echo", json!({"text": "again"}));
        Ok(tool_response(&format!("thinking {n}"), vec![call]))
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A provider that never answers.
pub struct HangingProvider;

#[async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A final text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A response requesting tool calls, with optional accompanying text.
pub fn tool_response(content: &str, calls: Vec<ToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools(content, calls),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// Returns its `text` argument.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the input text back"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("text", ParameterKind::String, "Text to echo")]
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<Value, ToolError> {
        Ok(Value::String(arguments.str("text")?.to_string()))
    }
}

/// Sleeps for a fixed time, then returns its own name.
pub struct SlowTool {
    name: String,
    delay: Duration,
}

impl SlowTool {
    pub fn new(name: &str, delay_ms: u64) -> Self {
        Self {
            name: name.into(),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Answer after a delay"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![]
    }

    async fn execute(&self, _arguments: ToolArguments) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(Value::String(self.name.clone()))
    }
}

pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Panics when called"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![]
    }

    async fn execute(&self, _arguments: ToolArguments) -> Result<Value, ToolError> {
        panic!("tool exploded");
    }
}
