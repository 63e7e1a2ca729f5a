//! Configuration loading, validation, and management for Delver.
//!
//! Loads configuration from `~/.delver/config.toml` (or an explicit path)
//! with environment variable overrides. The same document declares the
//! LLM provider, the retrieval tools, the agent loop settings and the
//! search strategy, and can be re-read at runtime for `reload`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Iteration bound used when `agent_config.max_iterations` is absent or invalid.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_provider")]
    pub default_provider: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Retrieval tools keyed by their registry name
    #[serde(default = "default_tools")]
    pub tools: BTreeMap<String, ToolDescriptor>,

    #[serde(default)]
    pub agent_config: AgentConfig,

    #[serde(default)]
    pub search_strategy: SearchStrategy,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_true() -> bool {
    true
}

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
            .field("providers", &self.providers)
            .field("tools", &self.tools)
            .field("agent_config", &self.agent_config)
            .field("search_strategy", &self.search_strategy)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL; for Azure this is the resource endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Azure OpenAI deployment name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,

    /// Azure OpenAI `api-version` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Declarative description of one retrieval tool.
///
/// `factory` names a kind in the tool registry's registration table; the
/// `config` table is handed to that kind's constructor. A missing or unknown
/// factory is a load error for that tool alone, reported by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, alias = "kind")]
    pub factory: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl ToolDescriptor {
    pub fn new(factory: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            enabled: true,
            factory: factory.into(),
            description: description.into(),
            config: serde_json::Map::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_setting(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.to_string(), value.into());
        self
    }
}

fn default_tools() -> BTreeMap<String, ToolDescriptor> {
    BTreeMap::from([
        (
            "web_search".to_string(),
            ToolDescriptor::new(
                "web_search",
                "Search the web for current information using DuckDuckGo",
            )
            .with_setting("max_results_default", 5)
            .with_setting("timeout", 10),
        ),
        (
            "wikipedia".to_string(),
            ToolDescriptor::new(
                "wikipedia",
                "Search Wikipedia for factual and encyclopedic information",
            )
            .with_setting("max_results_default", 3)
            .with_setting("summary_sentences", 3),
        ),
        (
            "content_extractor".to_string(),
            ToolDescriptor::new(
                "content_extractor",
                "Extract the main text content from a web page URL",
            )
            .with_setting("max_length_default", 2000)
            .with_setting("timeout", 10),
        ),
        (
            "calculator".to_string(),
            ToolDescriptor::new(
                "calculator",
                "Calculate mathematical expressions: addition, subtraction, multiplication and division",
            ),
        ),
    ])
}

/// Which controller answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Fixed analyze → gather → synthesize → evaluate pipeline.
    #[default]
    Pipeline,
    /// The model picks tools itself through function calling.
    ToolCalling,
}

impl std::fmt::Display for AgentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pipeline => f.write_str("pipeline"),
            Self::ToolCalling => f.write_str("tool_calling"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on research passes (pipeline) or model steps (tool calling).
    #[serde(
        default = "default_max_iterations",
        deserialize_with = "coerce_max_iterations"
    )]
    pub max_iterations: u32,

    #[serde(default)]
    pub mode: AgentMode,

    /// Past turns replayed to the tool-calling agent as chat history
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Log every stage transition at info level
    #[serde(default = "default_true")]
    pub verbose: bool,
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
fn default_history_window() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            mode: AgentMode::default(),
            history_window: default_history_window(),
            verbose: true,
        }
    }
}

/// Accepts any value for `max_iterations`, falling back to the default for
/// anything that is not a positive integer.
fn coerce_max_iterations<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let parsed = match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Some(n),
        Raw::Text(s) => s.trim().parse::<i64>().ok(),
        Raw::Other(_) => None,
    };

    Ok(parsed
        .filter(|n| *n >= 1)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or_else(|| {
            tracing::warn!(
                "Invalid agent_config.max_iterations, using {}",
                DEFAULT_MAX_ITERATIONS
            );
            DEFAULT_MAX_ITERATIONS
        }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchStrategy {
    /// How many leading web results get their page content extracted
    #[serde(default = "default_extraction_limit")]
    pub content_extraction_limit: usize,

    /// Maximum characters kept per extracted page
    #[serde(default = "default_extraction_max_length")]
    pub extraction_max_length: usize,
}

fn default_extraction_limit() -> usize {
    2
}
fn default_extraction_max_length() -> usize {
    2000
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self {
            content_extraction_limit: default_extraction_limit(),
            extraction_max_length: default_extraction_max_length(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.delver/config.toml).
    ///
    /// Environment variables fill in what the file leaves out:
    /// - `DELVER_API_KEY`, then `OPENAI_API_KEY`, then `OPENROUTER_API_KEY`
    /// - `AZURE_OPENAI_*` for the `azure` provider
    /// - `DELVER_PROVIDER` / `DELVER_MODEL` override the defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Load from `path` and apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = env_var("DELVER_API_KEY")
                .or_else(|| env_var("OPENAI_API_KEY"))
                .or_else(|| env_var("OPENROUTER_API_KEY"));
        }

        if let Some(endpoint) = env_var("AZURE_OPENAI_ENDPOINT") {
            let azure = self.providers.entry("azure".into()).or_default();
            azure.api_url.get_or_insert(endpoint);
            if azure.api_key.is_none() {
                azure.api_key = env_var("AZURE_OPENAI_API_KEY");
            }
            if azure.deployment.is_none() {
                azure.deployment = env_var("AZURE_OPENAI_DEPLOYMENT_NAME");
            }
            if azure.api_version.is_none() {
                azure.api_version = env_var("AZURE_OPENAI_API_VERSION");
            }
        }

        if let Some(provider) = env_var("DELVER_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = env_var("DELVER_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".delver")
    }

    /// Default location of the config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.search_strategy.content_extraction_limit > 10 {
            return Err(ConfigError::ValidationError(
                "search_strategy.content_extraction_limit must be at most 10".into(),
            ));
        }

        if self.search_strategy.extraction_max_length == 0 {
            return Err(ConfigError::ValidationError(
                "search_strategy.extraction_max_length must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Settings of the default provider, if configured explicitly.
    pub fn provider_config(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.default_provider)
    }

    /// The API key used for `provider`: its own key, else the global one.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Fail fast when the default provider cannot possibly authenticate.
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let provider = self.default_provider.as_str();
        if provider == "ollama" {
            return Ok(());
        }

        if self.api_key_for(provider).is_none() {
            return Err(ConfigError::MissingCredential(format!(
                "no API key for provider '{provider}' (set DELVER_API_KEY or providers.{provider}.api_key)"
            )));
        }

        if provider == "azure" {
            let azure = self.provider_config();
            if azure.and_then(|p| p.api_url.as_ref()).is_none() {
                return Err(ConfigError::MissingCredential(
                    "azure provider needs an endpoint (AZURE_OPENAI_ENDPOINT)".into(),
                ));
            }
            if azure.and_then(|p| p.deployment.as_ref()).is_none() {
                return Err(ConfigError::MissingCredential(
                    "azure provider needs a deployment (AZURE_OPENAI_DEPLOYMENT_NAME)".into(),
                ));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
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
            providers: HashMap::new(),
            tools: default_tools(),
            agent_config: AgentConfig::default(),
            search_strategy: SearchStrategy::default(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

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

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}
