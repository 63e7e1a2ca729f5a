//! Provider router: picks the LLM backend named in config.

use crate::openai_compat::OpenAiCompatProvider;
use delver_config::{AppConfig, ProviderConfig};
use delver_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider named by `default_provider`, if it could be built.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    pub fn default_name(&self) -> &str {
        &self.default_provider
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
/// Every `[providers.*]` table becomes a provider; the default provider is
/// added from well-known settings when it has no table of its own.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        if let Some(provider) = build_one(config, name, provider_config) {
            router.register(name.clone(), provider);
        }
    }

    if router.get(&config.default_provider).is_none() {
        let fallback = ProviderConfig::default();
        if let Some(provider) = build_one(config, &config.default_provider, &fallback) {
            router.register(config.default_provider.clone(), provider);
        }
    }

    router
}

fn build_one(
    config: &AppConfig,
    name: &str,
    provider_config: &ProviderConfig,
) -> Option<Arc<dyn Provider>> {
    let api_key = config.api_key_for(name).unwrap_or_default();

    if name == "azure" {
        let (Some(endpoint), Some(deployment)) = (
            provider_config.api_url.as_deref(),
            provider_config.deployment.as_deref(),
        ) else {
            warn!("Azure provider needs both an endpoint and a deployment; skipping");
            return None;
        };
        return Some(Arc::new(OpenAiCompatProvider::azure(
            endpoint,
            deployment,
            provider_config.api_version.as_deref(),
            api_key,
        )));
    }

    let base_url = provider_config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    Some(Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)))
}

/// Default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}
