//! Provider router: selects the chat model client based on config.

use std::collections::HashMap;
use std::sync::Arc;
use ragent_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes requests to the configured chat model client.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default_provider(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` entry becomes an OpenAI-compatible client;
/// the default provider is always present even when not configured.
pub fn build_from_config(config: &ragent_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(name.clone(), Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)));
    }

    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(&config.default_provider, &base_url, &api_key)),
        );
    }

    router
}

const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Base URL for a provider entry that sets no `api_url`.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => OPENAI_URL.into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        other => {
            tracing::warn!(provider = other, "No api_url configured, using the OpenAI endpoint");
            OPENAI_URL.into()
        }
    }
}
