//! Language-model gateway: one prompt in, one reply out.
//!
//! Wraps the configured [`Provider`] with the model and sampling settings
//! shared by every stage of the research loop.

use std::sync::Arc;

use delver_config::AppConfig;
use delver_core::error::GatewayError;
use delver_core::message::Message;
use delver_core::provider::{Provider, ProviderRequest, ToolDefinition};
use tracing::debug;

pub struct LlmGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.1,
            max_tokens: Some(1000),
        }
    }

    /// Model and sampling settings from config. A provider-level
    /// `default_model` wins over the global one.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let model = config
            .provider_config()
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self::new(provider, model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send a single user prompt and return the reply text.
    ///
    /// A blank reply is reported as [`GatewayError::EmptyResponse`].
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let reply = self.chat(vec![Message::user(prompt)], Vec::new()).await?;
        if reply.content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(reply.content)
    }

    /// Send a full transcript, optionally offering tools, and return the
    /// assistant message as-is (it may carry tool calls and no text).
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Message, GatewayError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools,
        };

        debug!(provider = %self.provider.name(), model = %self.model, "LLM request");
        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(tokens = usage.total_tokens, "LLM response");
        }
        Ok(response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, SequentialMockProvider};

    #[tokio::test]
    async fn complete_returns_text() {
        let gateway = LlmGateway::new(Arc::new(SequentialMockProvider::texts(&["hello"])), "m");
        assert_eq!(gateway.complete("hi").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn blank_reply_is_empty_response() {
        let gateway = LlmGateway::new(Arc::new(SequentialMockProvider::texts(&["  \n"])), "m");
        assert!(matches!(
            gateway.complete("hi").await,
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let gateway = LlmGateway::new(Arc::new(FailingProvider), "m");
        assert!(matches!(
            gateway.complete("hi").await,
            Err(GatewayError::Network(_))
        ));
    }

    #[test]
    fn from_config_prefers_provider_model() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            delver_config::ProviderConfig {
                default_model: Some("gpt-4o".into()),
                ..Default::default()
            },
        );
        let gateway = LlmGateway::from_config(Arc::new(FailingProvider), &config);
        assert_eq!(gateway.model(), "gpt-4o");
        assert_eq!(gateway.max_tokens, Some(1000));
    }
}
