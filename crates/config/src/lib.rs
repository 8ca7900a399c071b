//! Configuration loading, validation, and management for ragent.
//!
//! Loads configuration from `~/.ragent/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Toolsets the agent can be started with.
pub const TOOLSETS: &[&str] = &["rag", "car_simulation"];

/// Retrieval backends the search tool can be wired to.
pub const RETRIEVAL_BACKENDS: &[&str] = &["opensearch", "keyword"];

/// The root configuration structure.
///
/// Maps directly to `~/.ragent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Document store configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("gateway", &self.gateway)
            .field("retrieval", &self.retrieval)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl std::fmt::Debug for RetrievalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("index", &self.index)
            .field("top_k", &self.top_k)
            .field("split_length", &self.split_length)
            .field("split_overlap", &self.split_overlap)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("model_id", &self.model_id)
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

/// Settings for the tool-call loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Hard cap on model calls per request
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Run independent tool calls of one reply concurrently
    #[serde(default)]
    pub parallel_tool_calls: bool,

    /// Which tools the agent gets: "rag" or "car_simulation"
    #[serde(default = "default_toolset")]
    pub toolset: String,

    /// System prompt seeded at the start of every transcript
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_iterations() -> usize {
    25
}
fn default_toolset() -> String {
    "rag".into()
}

/// Default retrieval policy handed to the model.
pub fn default_system_prompt() -> String {
    "You are an agentic RAG system. For every user question proceed as follows:
1. Call \"rephrase_query\" exactly once, on the original question only, to align it with internal terms and abbreviations.
2. Search the knowledge base with the rephrased question using \"search_internal_knowledge\". Keep each search targeted and precise.

Approach:
- Decompose the question only when that improves the semantic search, e.g. for comparisons or questions spanning several topics.
- Otherwise issue a single precise search covering the whole question.
- Example (decomposition useful): \"What is the difference in population size between Germany and France?\" becomes \"How large is the population of France?\" and \"How large is the population of Germany?\".
- Example (no decomposition): \"What is the history of bread?\" becomes \"History of bread.\".

Rules:
- Plan top_k so that each user question retrieves at most 6 relevant fragments in total; split that budget across searches only when decomposing.
- Every search must be grounded in the original question. Do not add terms that are not implied by it.
- If nothing relevant is found, adjust the search at most twice using synonyms or alternative phrasing.
- If there are still no relevant results, tell the user: \"No relevant information could be found for your request.\""
        .into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            parallel_tool_calls: false,
            toolset: default_toolset(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Model id advertised by `/v1/models` and echoed in completions
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Bearer keys accepted on `/v1`. Empty = no auth.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<String>,

    /// Allowed CORS origins. Empty = same-origin only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_model_id() -> String {
    "ragent-agent".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            model_id: default_model_id(),
            api_keys: vec![],
            cors_origins: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// "opensearch" or "keyword" (offline stub)
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_search_host")]
    pub host: String,

    #[serde(default = "default_search_username")]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_index")]
    pub index: String,

    /// Fragments returned per search unless the model asks otherwise
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Words per indexed fragment
    #[serde(default = "default_split_length")]
    pub split_length: usize,

    /// Words shared between consecutive fragments
    #[serde(default = "default_split_overlap")]
    pub split_overlap: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend() -> String {
    "opensearch".into()
}
fn default_search_host() -> String {
    "http://opensearch:9200".into()
}
fn default_search_username() -> String {
    "admin".into()
}
fn default_index() -> String {
    "document".into()
}
fn default_top_k() -> usize {
    5
}
fn default_split_length() -> usize {
    250
}
fn default_split_overlap() -> usize {
    50
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            host: default_search_host(),
            username: default_search_username(),
            password: None,
            index: default_index(),
            top_k: default_top_k(),
            split_length: default_split_length(),
            split_overlap: default_split_overlap(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragent/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_path())
    }

    /// Load from a specific file, then apply environment overrides.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// - `RAGENT_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `RAGENT_PROVIDER`, `RAGENT_MODEL`
    /// - `OPENSEARCH_HOST`, `OPENSEARCH_USERNAME`, `OPENSEARCH_PASSWORD`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("RAGENT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("RAGENT_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("RAGENT_MODEL") {
            self.default_model = model;
        }
        if let Some(host) = lookup("OPENSEARCH_HOST") {
            self.retrieval.host = host;
        }
        if let Some(user) = lookup("OPENSEARCH_USERNAME") {
            self.retrieval.username = user;
        }
        if let Some(password) = lookup("OPENSEARCH_PASSWORD") {
            self.retrieval.password = Some(password);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragent")
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }
        if !TOOLSETS.contains(&self.agent.toolset.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "agent.toolset '{}' is not one of {:?}",
                self.agent.toolset, TOOLSETS
            )));
        }
        if !RETRIEVAL_BACKENDS.contains(&self.retrieval.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "retrieval.backend '{}' is not one of {:?}",
                self.retrieval.backend, RETRIEVAL_BACKENDS
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError("retrieval.top_k must be > 0".into()));
        }
        if self.retrieval.split_length == 0 || self.retrieval.split_overlap >= self.retrieval.split_length {
            return Err(ConfigError::ValidationError(
                "retrieval.split_overlap must be smaller than retrieval.split_length".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentSettings::default(),
            gateway: GatewayConfig::default(),
            retrieval: RetrievalConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
