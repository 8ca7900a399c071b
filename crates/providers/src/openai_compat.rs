//! OpenAI-compatible chat-completion client.
//!
//! Works with OpenAI and any endpoint exposing `/v1/chat/completions`
//! (Azure-style proxies, vLLM, Ollama, LiteLLM).
//!
//! Supports:
//! - Chat completions (blocking and streaming SSE)
//! - Function calling, with tool-call deltas reassembled in index order
//! - Model listing

use async_trait::async_trait;
use futures::StreamExt;
use ragent_core::error::ProviderError;
use ragent_core::message::{Message, ToolCall};
use ragent_core::provider::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible chat model client.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert transcript messages to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments_json(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id().map(str::to_string),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        body
    }

    async fn post(&self, body: &serde_json::Value, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited { retry_after_secs: 5 }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                })
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, tools = request.tools.len(), "Sending completion request");

        let body = Self::request_body(&request, false);
        let response = self.post(&body, false).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::from_raw_arguments(tc.id, tc.function.name, &tc.function.arguments))
            .collect();

        let message = Message::assistant_with_tools(choice.message.content.unwrap_or_default(), tool_calls);

        Ok(ProviderResponse {
            message,
            usage: api_response.usage.map(ApiUsage::into_usage),
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let body = Self::request_body(&request, true);
        let response = self.post(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream and forward decoded chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                        return;
                    }
                };

                for chunk in decoder.feed(&bytes, &provider_name) {
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() || done {
                        return;
                    }
                }
            }

            // Stream ended without [DONE]
            let _ = tx.send(Ok(decoder.finish(None))).await;
        });

        Ok(rx)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let models = body["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }
}

/// Incremental decoder for an OpenAI SSE body.
///
/// Content deltas are emitted as they arrive; tool-call fragments are
/// buffered and emitted once, ordered by their index, on the final chunk.
///
/// Raw bytes are buffered and only complete lines are decoded, so a
/// multi-byte character split across two reads survives intact.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    finished: bool,
}

impl SseDecoder {
    /// Feed raw body bytes; returns the chunks completed by them.
    fn feed(&mut self, bytes: impl AsRef<[u8]>, provider_name: &str) -> Vec<StreamChunk> {
        self.buffer.extend_from_slice(bytes.as_ref());
        let mut out = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if self.finished || line.is_empty() || line.starts_with(':') {
                continue;
            }
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                out.push(self.finish(None));
                continue;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                Ok(resp) => {
                    if let Some(choice) = resp.choices.into_iter().next() {
                        for delta in choice.delta.tool_calls.unwrap_or_default() {
                            let acc = self.tool_calls.entry(delta.index).or_default();
                            if let Some(id) = delta.id {
                                acc.id = id;
                            }
                            if let Some(func) = delta.function {
                                if let Some(name) = func.name {
                                    acc.name = name;
                                }
                                if let Some(args) = func.arguments {
                                    acc.arguments.push_str(&args);
                                }
                            }
                        }
                        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                            out.push(StreamChunk {
                                content: Some(content),
                                ..StreamChunk::default()
                            });
                        }
                    }

                    // Usage arrives in a trailing chunk when stream_options.include_usage is set
                    if let Some(usage) = resp.usage {
                        out.push(self.finish(Some(usage.into_usage())));
                    }
                }
                Err(e) => {
                    trace!(provider = %provider_name, data = %data, error = %e, "Ignoring unparseable SSE chunk");
                }
            }
        }
        out
    }

    /// Produce the terminal chunk carrying the assembled tool calls.
    fn finish(&mut self, usage: Option<Usage>) -> StreamChunk {
        self.finished = true;
        let tool_calls = std::mem::take(&mut self.tool_calls)
            .into_values()
            .map(|acc| ToolCall::from_raw_arguments(acc.id, acc.name, &acc.arguments))
            .collect();
        StreamChunk {
            content: None,
            tool_calls,
            done: true,
            usage,
        }
    }
}

/// Accumulates incremental tool call deltas into a complete tool call.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl ApiUsage {
    fn into_usage(self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens,
        }
    }
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta; arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};
    use ragent_core::message::{Role, ToolCallResult};
    use serde_json::json;

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o".into(),
            messages,
            temperature: 0.0,
            max_tokens: None,
            tools: vec![],
            stream: false,
        }
    }

    /// Serve a router on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert_eq!(provider.name(), "openai");
        assert!(provider.base_url().contains("api.openai.com"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("local", "http://localhost:8080/v1/", "");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn message_conversion_with_tool_calls_and_results() {
        let call = ToolCall::new("call_1", "search_internal_knowledge", json!({"query": "germany"}));
        let messages = vec![
            Message::system("policy"),
            Message::user("population?"),
            Message::assistant_with_tools("", vec![call.clone()]),
            Message::tool_result(ToolCallResult::success(call, json!("Germany has 10 million inhabitants."))),
        ];
        let api = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api[0].role, "system");
        let tc = api[2].tool_calls.as_ref().unwrap();
        assert_eq!(tc[0].function.name, "search_internal_knowledge");
        assert_eq!(tc[0].function.arguments, r#"{"query":"germany"}"#);
        assert_eq!(api[3].role, "tool");
        assert_eq!(api[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(api[3].content.as_deref(), Some("Germany has 10 million inhabitants."));
    }

    #[test]
    fn tool_definition_conversion() {
        let tools = vec![ToolDefinition {
            name: "rephrase_query".into(),
            description: "Rephrase".into(),
            parameters: json!({"type": "object"}),
        }];
        let api_tools = OpenAiCompatProvider::to_api_tools(&tools);
        assert_eq!(api_tools[0].function.name, "rephrase_query");
        assert_eq!(api_tools[0].r#type, "function");
    }

    #[test]
    fn streaming_body_requests_usage() {
        let body = OpenAiCompatProvider::request_body(&request(vec![Message::user("hi")]), true);
        assert_eq!(body["stream"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert!(body.get("tools").is_none());
    }

    // --- SSE decoding ---

    #[test]
    fn decoder_emits_content_in_order() {
        let mut d = SseDecoder::default();
        let chunks = d.feed(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "test",
        );
        let text: Vec<_> = chunks.iter().filter_map(|c| c.content.clone()).collect();
        assert_eq!(text, vec!["Hel", "lo"]);
        assert!(chunks.iter().all(|c| !c.done));
    }

    #[test]
    fn decoder_handles_lines_split_across_reads() {
        let mut d = SseDecoder::default();
        assert!(d.feed("data: {\"choices\":[{\"delta\":{\"con", "test").is_empty());
        let chunks = d.feed("tent\":\"ok\"}}]}\n", "test");
        assert_eq!(chunks[0].content.as_deref(), Some("ok"));
    }

    #[test]
    fn decoder_keeps_multibyte_characters_split_across_reads() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Grüße\"}}]}\n".as_bytes();
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut d = SseDecoder::default();
        assert!(d.feed(&body[..split], "test").is_empty());
        let chunks = d.feed(&body[split..], "test");
        assert_eq!(chunks[0].content.as_deref(), Some("Grüße"));
    }

    #[test]
    fn decoder_assembles_tool_calls_by_index() {
        let mut d = SseDecoder::default();
        let stream = concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":1,\"id\":\"call_b\",\"function\":{\"name\":\"search_internal_knowledge\",\"arguments\":\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"search_internal_knowledge\",\"arguments\":\"{\\\"query\\\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\": \\\"germany\\\"}\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":1,\"function\":{\"arguments\":\"{\\\"query\\\": \\\"france\\\"}\"}}]}}]}\n",
            "data: [DONE]\n",
        );
        let chunks = d.feed(stream, "test");
        let last = chunks.last().unwrap();
        assert!(last.done);
        assert_eq!(last.tool_calls.len(), 2);
        assert_eq!(last.tool_calls[0].id, "call_a");
        assert_eq!(last.tool_calls[0].arguments, json!({"query": "germany"}));
        assert_eq!(last.tool_calls[1].id, "call_b");
        assert_eq!(last.tool_calls[1].arguments, json!({"query": "france"}));
    }

    #[test]
    fn decoder_finishes_on_usage_and_ignores_rest() {
        let mut d = SseDecoder::default();
        let chunks = d.feed(
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":5,\"total_tokens\":15}}\ndata: [DONE]\n",
            "test",
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn decoder_skips_comments_and_garbage() {
        let mut d = SseDecoder::default();
        let chunks = d.feed(": keep-alive\nevent: ping\ndata: {not json}\n", "test");
        assert!(chunks.is_empty());
    }

    // --- HTTP round trips against a local mock ---

    #[tokio::test]
    async fn complete_parses_tool_calls() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["stream"], false);
                Json(json!({
                    "model": "gpt-4o-2024",
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_1",
                                "type": "function",
                                "function": {"name": "rephrase_query", "arguments": "{\"original_question\":\"q\"}"}
                            }]
                        }
                    }],
                    "usage": {"prompt_tokens": 7, "completion_tokens": 3, "total_tokens": 10}
                }))
            }),
        );
        let base = serve(app).await;
        let provider = OpenAiCompatProvider::new("mock", base, "sk-test");

        let resp = provider.complete(request(vec![Message::user("q")])).await.unwrap();
        assert_eq!(resp.model, "gpt-4o-2024");
        assert_eq!(resp.message.role, Role::Assistant);
        assert_eq!(resp.message.tool_calls.len(), 1);
        assert_eq!(resp.message.tool_calls[0].arguments, json!({"original_question": "q"}));
        assert_eq!(resp.usage.unwrap().total_tokens, 10);
    }

    #[tokio::test]
    async fn complete_maps_status_codes() {
        let app = Router::new()
            .route(
                "/unauthorized/chat/completions",
                post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "nope") }),
            )
            .route(
                "/broken/chat/completions",
                post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let base = serve(app).await;
        let root = base.trim_end_matches("/v1");

        let unauthorized = OpenAiCompatProvider::new("mock", format!("{root}/unauthorized"), "");
        let err = unauthorized.complete(request(vec![])).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

        let broken = OpenAiCompatProvider::new("mock", format!("{root}/broken"), "");
        let err = broken.complete(request(vec![])).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn stream_forwards_fragments_then_done() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    [("content-type", "text/event-stream")],
                    concat!(
                        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
                        "data: {\"choices\":[{\"delta\":{\"content\":\"Germany \"}}]}\n\n",
                        "data: {\"choices\":[{\"delta\":{\"content\":\"is larger.\"}}]}\n\n",
                        "data: [DONE]\n\n",
                    ),
                )
            }),
        );
        let base = serve(app).await;
        let provider = OpenAiCompatProvider::new("mock", base, "");

        let mut rx = provider.stream(request(vec![Message::user("q")])).await.unwrap();
        let mut text = String::new();
        let mut saw_done = false;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            if let Some(c) = chunk.content {
                text.push_str(&c);
            }
            if chunk.done {
                saw_done = true;
                assert!(chunk.tool_calls.is_empty());
            }
        }
        assert_eq!(text, "Germany is larger.");
        assert!(saw_done);
    }

    #[tokio::test]
    async fn stream_survives_frames_split_inside_a_character() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Grüße\"}}]}\n\ndata: [DONE]\n\n".as_bytes();
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let (first, second) = (body[..split].to_vec(), body[split..].to_vec());

        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let frames = vec![(first.clone(), 0u64), (second.clone(), 50)];
                async move {
                    let body = futures::stream::iter(frames).then(|(bytes, delay_ms)| async move {
                        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                        Ok::<_, std::io::Error>(bytes)
                    });
                    (
                        [("content-type", "text/event-stream")],
                        axum::body::Body::from_stream(body),
                    )
                }
            }),
        );
        let base = serve(app).await;
        let provider = OpenAiCompatProvider::new("mock", base, "");

        let mut rx = provider.stream(request(vec![Message::user("q")])).await.unwrap();
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            if let Some(c) = chunk.unwrap().content {
                text.push_str(&c);
            }
        }
        assert_eq!(text, "Grüße");
    }
}
