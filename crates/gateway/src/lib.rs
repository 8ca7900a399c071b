//! OpenAI-compatible HTTP gateway for ragent.
//!
//! Exposes the agent as `/v1/chat/completions` (plain and SSE), plus model
//! and tool listings and a health check. Everything a handler needs is built
//! once at startup into [`AppState`].

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use ragent_agent::AgentLoop;
use ragent_config::{AppConfig, GatewayConfig};
use ragent_core::error::ToolError;
use ragent_core::provider::ToolDefinition;
use ragent_retrieval::RetrievalError;

/// Shared application state, immutable after startup.
pub struct AppState {
    pub agent: Arc<AgentLoop>,
    /// Model id advertised to clients
    pub model_id: String,
    pub tools: Vec<ToolDefinition>,
    /// Accepted bearer keys; empty disables auth
    pub api_keys: Vec<String>,
}

impl AppState {
    pub fn new(agent: Arc<AgentLoop>, gateway: &GatewayConfig) -> Self {
        let tools = agent.tools().definitions();
        Self {
            agent,
            model_id: gateway.model_id.clone(),
            tools,
            api_keys: gateway.api_keys.clone(),
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

pub type SharedState = Arc<AppState>;

/// Failures while assembling the agent at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("no provider named '{0}' is configured")]
    NoProvider(String),

    #[error("retrieval backend: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("tool registry: {0}")]
    Tools(#[from] ToolError),
}

/// Build the agent described by `config`, with tools from `toolset`.
pub fn build_agent(config: &AppConfig, toolset: &str) -> Result<AgentLoop, StartupError> {
    let router = ragent_providers::build_from_config(config);
    let provider = router
        .default_provider()
        .ok_or_else(|| StartupError::NoProvider(config.default_provider.clone()))?;

    let backend = ragent_retrieval::backend_from_config(&config.retrieval)?;
    let tools = ragent_tools::registry_for_toolset(toolset, backend, config.retrieval.top_k)?;
    info!(
        provider = %config.default_provider,
        toolset,
        tools = ?tools.names(),
        "Agent assembled"
    );

    Ok(AgentLoop::configured(provider, Arc::new(tools), config))
}

/// Build the full router.
///
/// Layers applied:
/// - Bearer key authentication on `/v1` routes (when keys are configured)
/// - CORS for the configured origins
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    let v1 = api_v1::v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let agent = Arc::new(build_agent(&config, &config.agent.toolset)?);
    let state = Arc::new(AppState::new(agent, &config.gateway));
    let app = build_router(state, &config.gateway.cors_origins);

    info!(addr = %addr, model_id = %config.gateway.model_id, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Authentication middleware for the /v1 API.
///
/// Requires `Authorization: Bearer <key>` when any key is configured.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if state.api_keys.is_empty() {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(key) if state.api_keys.iter().any(|k| k == key) => Ok(next.run(req).await),
        _ => {
            warn!("Unauthorized request to /v1 API: missing or invalid bearer key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
