//! HTTP API v1: OpenAI-compatible surface over the agent.
//!
//! Endpoints:
//!
//! - `POST /v1/chat/completions`: run the agent; JSON or SSE (`stream: true`)
//! - `GET  /v1/models`: the single advertised model
//! - `GET  /v1/tools`: tool definitions sent to the model

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use futures::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use ragent_agent::{AgentStreamEvent, render_report, render_tool_summary, spawn_agent_stream};
use ragent_core::error::Error as AgentError;
use ragent_core::message::{Message, Role};
use ragent_core::provider::{ToolDefinition, Usage};

use crate::SharedState;

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat/completions", post(chat_completions_handler))
        .route("/models", get(list_models_handler))
        .route("/tools", get(list_tools_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    /// Accepted for compatibility; the configured model is always used.
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ClientMessage>,
    #[serde(default)]
    pub stream: bool,
    /// Accepted for compatibility; the configured temperature is always used.
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CompletionChunk {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<&'static str>,
}

#[derive(Debug, Default, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Serialize)]
struct InvalidRequest {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ModelList {
    object: &'static str,
    data: Vec<ModelEntry>,
}

#[derive(Serialize)]
struct ModelEntry {
    id: String,
    object: &'static str,
    created: i64,
    owned_by: &'static str,
}

#[derive(Serialize)]
struct ToolList {
    tools: Vec<ToolDefinition>,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(InvalidRequest {
            error: ErrorBody {
                message: message.into(),
                kind: "invalid_request_error",
            },
        }),
    )
        .into_response()
}

/// Convert client messages; only system, user and assistant roles are accepted.
fn convert_messages(messages: &[ClientMessage]) -> Result<Vec<Message>, String> {
    if messages.is_empty() {
        return Err("messages must not be empty".into());
    }
    messages
        .iter()
        .map(|m| match Role::from_str(&m.role) {
            Ok(role @ (Role::System | Role::User | Role::Assistant)) => {
                Ok(Message::from_role(role, m.content.clone().unwrap_or_default()))
            }
            Ok(other) => Err(format!("role '{}' is not accepted from clients", other.as_str())),
            Err(e) => Err(e),
        })
        .collect()
}

/// Identity shared by every chunk of one streamed completion.
#[derive(Clone)]
struct CompletionMeta {
    id: String,
    created: i64,
    model: String,
}

impl CompletionMeta {
    fn new(model: &str) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
        }
    }

    fn completion(
        &self,
        content: String,
        finish_reason: &'static str,
        usage: Option<Usage>,
        error: Option<ErrorBody>,
    ) -> ChatCompletion {
        ChatCompletion {
            id: self.id.clone(),
            object: "chat.completion",
            created: self.created,
            model: self.model.clone(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant",
                    content,
                },
                finish_reason,
            }],
            usage,
            error,
        }
    }

    fn chunk(&self, delta: Delta, finish_reason: Option<&'static str>, usage: Option<Usage>) -> CompletionChunk {
        CompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk",
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        }
    }

    fn content_chunk(&self, content: String) -> CompletionChunk {
        self.chunk(
            Delta {
                content: Some(content),
                ..Default::default()
            },
            None,
            None,
        )
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_completions_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatCompletionRequest>,
) -> Response {
    let messages = match convert_messages(&payload.messages) {
        Ok(messages) => messages,
        Err(reason) => return bad_request(reason),
    };
    if let Some(model) = payload.model.as_deref().filter(|m| *m != state.model_id) {
        debug!(requested = %model, "Ignoring client model, using configured model");
    }
    if payload.temperature.is_some() {
        debug!("Ignoring client temperature");
    }

    info!(messages = messages.len(), stream = payload.stream, "chat completion request");
    let transcript = state.agent.seed(messages);
    let meta = CompletionMeta::new(&state.model_id);

    if payload.stream {
        return stream_completion(state, transcript, meta).into_response();
    }

    match state.agent.process(transcript).await {
        Ok(outcome) => {
            let content = render_report(&state.tool_names(), &outcome.transcript, &outcome.answer);
            let finish_reason = if outcome.truncated() { "length" } else { "stop" };
            Json(meta.completion(content, finish_reason, Some(outcome.usage), None)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Agent run failed");
            let (status, kind) = match &e {
                AgentError::ModelCallFailed(_) => (StatusCode::BAD_GATEWAY, "model_call_failed"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            };
            let body = meta.completion(
                format!("Error: {e}"),
                "error",
                None,
                Some(ErrorBody {
                    message: e.to_string(),
                    kind,
                }),
            );
            (status, Json(body)).into_response()
        }
    }
}

/// One SSE frame before numbering.
enum Frame {
    Chunk(CompletionChunk),
    Done,
}

/// Map one agent event to the chunk the client sees, if any.
fn event_to_chunk(meta: &CompletionMeta, event: AgentStreamEvent) -> Option<CompletionChunk> {
    match event {
        AgentStreamEvent::Chunk { content } => Some(meta.content_chunk(content)),
        AgentStreamEvent::ToolCall { .. } => None,
        AgentStreamEvent::ToolResult {
            name,
            arguments,
            output,
            ..
        } => Some(meta.content_chunk(format!(
            "\n\n{}\n\n",
            render_tool_summary(&name, &arguments, &output)
        ))),
        AgentStreamEvent::Done { truncated, usage, .. } => {
            let finish_reason = if truncated { "length" } else { "stop" };
            Some(meta.chunk(Delta::default(), Some(finish_reason), usage))
        }
        AgentStreamEvent::Error { message } => Some(meta.chunk(
            Delta {
                content: Some(format!("Error: {message}")),
                ..Default::default()
            },
            Some("error"),
            None,
        )),
    }
}

/// Stream a completion as `chat.completion.chunk` SSE events ending in `[DONE]`.
///
/// The agent runs on its own task; dropping the response stream (client
/// disconnect) cancels it.
fn stream_completion(
    state: SharedState,
    transcript: ragent_core::message::Transcript,
    meta: CompletionMeta,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, axum::Error>>> {
    let cancel = CancellationToken::new();
    let cancel_on_drop = cancel.clone().drop_guard();
    let events = spawn_agent_stream(state.agent.clone(), transcript, cancel);

    let role_chunk = meta.chunk(
        Delta {
            role: Some("assistant"),
            content: None,
        },
        None,
        None,
    );
    let chunk_meta = meta.clone();

    let frames = stream::once(future::ready(Frame::Chunk(role_chunk)))
        .chain(events.filter_map(move |event| future::ready(event_to_chunk(&chunk_meta, event).map(Frame::Chunk))))
        .chain(stream::once(future::ready(Frame::Done)));

    let sse = frames.enumerate().map(move |(seq, frame)| {
        let _cancel_on_drop = &cancel_on_drop;
        let event = SseEvent::default().id(seq.to_string());
        match frame {
            Frame::Chunk(chunk) => event.json_data(&chunk),
            Frame::Done => Ok(event.data("[DONE]")),
        }
    });

    Sse::new(sse).keep_alive(KeepAlive::default())
}

async fn list_models_handler(State(state): State<SharedState>) -> Json<ModelList> {
    Json(ModelList {
        object: "list",
        data: vec![ModelEntry {
            id: state.model_id.clone(),
            object: "model",
            created: 0,
            owned_by: "ragent",
        }],
    })
}

async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolList> {
    Json(ToolList {
        tools: state.tools.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppState;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ragent_agent::AgentLoop;
    use ragent_core::error::ProviderError;
    use ragent_core::message::ToolCall;
    use ragent_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use ragent_core::tool::ToolRegistry;
    use ragent_retrieval::KeywordBackend;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Returns scripted responses in order, then fails.
    struct ScriptedProvider {
        responses: Mutex<Vec<ProviderResponse>>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<ProviderResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 500,
                    message: "script exhausted".into(),
                })
        }
    }

    fn reply(content: &str, calls: Vec<ToolCall>) -> ProviderResponse {
        ProviderResponse {
            message: Message::assistant_with_tools(content, calls),
            usage: Some(Usage {
                prompt_tokens: 7,
                completion_tokens: 3,
                total_tokens: 10,
            }),
            model: "mock-model".into(),
        }
    }

    fn app(responses: Vec<ProviderResponse>, max_iterations: usize) -> Router {
        let tools = ragent_tools::rag_registry(Arc::new(KeywordBackend), 5).unwrap();
        let agent = AgentLoop::new(Arc::new(ScriptedProvider::new(responses)), "mock-model", Arc::new(tools))
            .with_max_iterations(max_iterations);
        let gateway = ragent_config::GatewayConfig::default();
        v1_router(Arc::new(AppState::new(Arc::new(agent), &gateway)))
    }

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat/completions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// (id, data) pairs of an SSE body.
    fn sse_frames(body: &str) -> Vec<(u64, String)> {
        body.split("\n\n")
            .filter(|block| !block.trim().is_empty())
            .filter_map(|block| {
                let mut id = None;
                let mut data = None;
                for line in block.lines() {
                    if let Some(v) = line.strip_prefix("id: ") {
                        id = v.parse().ok();
                    } else if let Some(v) = line.strip_prefix("data: ") {
                        data = Some(v.to_string());
                    }
                }
                Some((id?, data?))
            })
            .collect()
    }

    #[tokio::test]
    async fn completion_has_openai_shape() {
        let app = app(vec![reply("Hello there!", vec![])], 25);

        let response = app
            .oneshot(chat_request(json!({
                "model": "anything",
                "messages": [{"role": "user", "content": "Hi"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["model"], "ragent-agent");
        assert_eq!(body["choices"][0]["message"]["role"], "assistant");
        assert_eq!(body["choices"][0]["message"]["content"], "Hello there!");
        assert_eq!(body["choices"][0]["finish_reason"], "stop");
        assert_eq!(body["usage"]["total_tokens"], 10);
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn tool_run_is_rendered_as_report() {
        let app = app(
            vec![
                reply(
                    "",
                    vec![ToolCall::new("c1", "search_internal_knowledge", json!({"query": "germany"}))],
                ),
                reply("Germany has 10 million inhabitants.", vec![]),
            ],
            25,
        );

        let response = app
            .oneshot(chat_request(json!({
                "messages": [{"role": "user", "content": "How many people live in Germany?"}]
            })))
            .await
            .unwrap();
        let body = json_body(response).await;
        let content = body["choices"][0]["message"]["content"].as_str().unwrap();

        assert!(content.starts_with("```mermaid"));
        assert!(content.contains("B --> T2([search_internal_knowledge]);"));
        assert!(content.contains("> | Query | **germany** |"));
        assert!(content.ends_with("---\nGermany has 10 million inhabitants."));
        assert_eq!(body["usage"]["total_tokens"], 20);
    }

    #[tokio::test]
    async fn truncated_run_finishes_with_length() {
        let looping: Vec<_> = (0..3)
            .map(|i| {
                reply(
                    &format!("step {i}"),
                    vec![ToolCall::new(format!("c{i}"), "rephrase_query", json!({"original_question": "q"}))],
                )
            })
            .collect();
        let app = app(looping, 2);

        let response = app
            .oneshot(chat_request(json!({"messages": [{"role": "user", "content": "q"}]})))
            .await
            .unwrap();
        let body = json_body(response).await;

        assert_eq!(body["choices"][0]["finish_reason"], "length");
        let content = body["choices"][0]["message"]["content"].as_str().unwrap();
        assert!(content.ends_with(ragent_agent::TRUNCATION_NOTICE));
    }

    #[tokio::test]
    async fn unsupported_role_is_rejected() {
        let app = app(vec![], 25);

        let response = app
            .clone()
            .oneshot(chat_request(json!({"messages": [{"role": "tool", "content": "x"}]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");

        let response = app
            .clone()
            .oneshot(chat_request(json!({"messages": [{"role": "wizard", "content": "x"}]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(chat_request(json!({"messages": []}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn model_failure_is_completion_shaped_502() {
        let app = app(vec![], 25);

        let response = app
            .oneshot(chat_request(json!({"messages": [{"role": "user", "content": "Hi"}]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = json_body(response).await;
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["choices"][0]["finish_reason"], "error");
        let content = body["choices"][0]["message"]["content"].as_str().unwrap();
        assert!(content.starts_with("Error: "));
        assert!(body["error"]["message"].as_str().unwrap().contains("script exhausted"));
        assert_eq!(body["error"]["type"], "model_call_failed");
    }

    #[tokio::test]
    async fn stream_numbers_events_and_ends_with_done() {
        let app = app(
            vec![
                reply("", vec![ToolCall::new("c1", "search_internal_knowledge", json!({"query": "france"}))]),
                reply("France has 5 million inhabitants.", vec![]),
            ],
            25,
        );

        let response = app
            .oneshot(chat_request(json!({
                "messages": [{"role": "user", "content": "France?"}],
                "stream": true
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        assert!(content_type.contains("text/event-stream"), "got '{content_type}'");

        let frames = sse_frames(&text_body(response).await);
        let ids: Vec<u64> = frames.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, (0..frames.len() as u64).collect::<Vec<_>>());
        assert_eq!(frames.last().unwrap().1, "[DONE]");

        let chunks: Vec<Value> = frames[..frames.len() - 1]
            .iter()
            .map(|(_, data)| serde_json::from_str(data).unwrap())
            .collect();
        assert_eq!(chunks[0]["object"], "chat.completion.chunk");
        assert_eq!(chunks[0]["choices"][0]["delta"]["role"], "assistant");

        let text: String = chunks
            .iter()
            .filter_map(|c| c["choices"][0]["delta"]["content"].as_str())
            .collect();
        assert!(text.contains("> **`search_internal_knowledge`**"));
        assert!(text.contains("> France has 5 million inhabitants."));
        assert!(text.ends_with("France has 5 million inhabitants."));

        let last = chunks.last().unwrap();
        assert_eq!(last["choices"][0]["finish_reason"], "stop");
        assert_eq!(last["usage"]["total_tokens"], 20);
    }

    #[tokio::test]
    async fn stream_failure_sends_error_chunk_then_done() {
        let app = app(vec![], 25);

        let response = app
            .oneshot(chat_request(json!({
                "messages": [{"role": "user", "content": "Hi"}],
                "stream": true
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let frames = sse_frames(&text_body(response).await);
        assert_eq!(frames.len(), 3);
        let error_chunk: Value = serde_json::from_str(&frames[1].1).unwrap();
        assert_eq!(error_chunk["choices"][0]["finish_reason"], "error");
        assert!(
            error_chunk["choices"][0]["delta"]["content"]
                .as_str()
                .unwrap()
                .starts_with("Error: ")
        );
        assert_eq!(frames[2].1, "[DONE]");
    }

    #[tokio::test]
    async fn models_lists_configured_id() {
        let response = app(vec![], 25)
            .oneshot(Request::builder().uri("/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["object"], "list");
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], "ragent-agent");
    }

    #[tokio::test]
    async fn tools_lists_definitions() {
        let response = app(vec![], 25)
            .oneshot(Request::builder().uri("/tools").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(response).await;
        let names: Vec<&str> = body["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["rephrase_query", "search_internal_knowledge"]);
        assert_eq!(body["tools"][1]["parameters"]["required"][0], "query");
    }

    #[test]
    fn client_messages_convert_in_order() {
        let messages = convert_messages(&[
            ClientMessage {
                role: "system".into(),
                content: Some("extra".into()),
            },
            ClientMessage {
                role: "assistant".into(),
                content: None,
            },
        ])
        .unwrap();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "");
    }

    /// Never answers; records when its pending call starts and when it is dropped.
    struct StalledProvider {
        started: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Provider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let _on_drop = SetOnDrop(self.dropped.clone());
            self.started.store(true, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    async fn wait_for(flag: &AtomicBool) -> bool {
        for _ in 0..100 {
            if flag.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn client_disconnect_cancels_the_running_agent() {
        let started = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        let provider = StalledProvider {
            started: started.clone(),
            dropped: dropped.clone(),
        };
        let agent = AgentLoop::new(Arc::new(provider), "mock-model", Arc::new(ToolRegistry::new()));
        let app = v1_router(Arc::new(AppState::new(
            Arc::new(agent),
            &ragent_config::GatewayConfig::default(),
        )));

        let response = app
            .oneshot(chat_request(json!({
                "messages": [{"role": "user", "content": "hi"}],
                "stream": true
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        let first = String::from_utf8(first.to_vec()).unwrap();
        assert!(first.contains("id: 0"));
        assert!(first.contains("\"role\":\"assistant\""));

        assert!(wait_for(&started).await, "model call never started");
        assert!(!dropped.load(Ordering::SeqCst));

        drop(body);
        assert!(wait_for(&dropped).await, "model call still running after disconnect");
    }
}
