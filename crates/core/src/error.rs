//! Error types for the Delver domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; configuration errors live
//! in `delver-config` next to the loader that produces them.

use thiserror::Error;

/// A failed call to the language model.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// A single tool that could not be instantiated from its descriptor.
#[derive(Debug, Clone, Error)]
pub enum RegistryLoadError {
    #[error("Tool '{tool}' does not name a factory")]
    MissingFactory { tool: String },

    #[error("Tool '{tool}' references unknown factory '{factory}'")]
    UnknownFactory { tool: String, factory: String },

    #[error("Tool '{tool}' has invalid config: {reason}")]
    InvalidConfig { tool: String, reason: String },

    #[error("Tool '{tool}' failed to initialize: {reason}")]
    InitFailed { tool: String, reason: String },
}

impl RegistryLoadError {
    /// Name of the tool that failed to load.
    pub fn tool(&self) -> &str {
        match self {
            Self::MissingFactory { tool }
            | Self::UnknownFactory { tool, .. }
            | Self::InvalidConfig { tool, .. }
            | Self::InitFailed { tool, .. } => tool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_displays_correctly() {
        let err = GatewayError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn registry_error_names_tool() {
        let err = RegistryLoadError::UnknownFactory {
            tool: "news".into(),
            factory: "news_api".into(),
        };
        assert_eq!(err.tool(), "news");
        assert!(err.to_string().contains("news_api"));
    }

    #[test]
    fn missing_factory_names_tool() {
        let err = RegistryLoadError::MissingFactory {
            tool: "broken".into(),
        };
        assert_eq!(err.tool(), "broken");
        assert_eq!(err.to_string(), "Tool 'broken' does not name a factory");
    }
}
