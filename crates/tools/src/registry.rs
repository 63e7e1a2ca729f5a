//! Tool registry: instantiates retrieval tools from declarative descriptors.
//!
//! Descriptors name a factory kind; kinds are resolved against a
//! [`FactoryTable`]. The live tool set is an immutable [`RegistrySnapshot`]
//! behind a lock, so a reload is a single swap and readers holding an older
//! snapshot keep a consistent view until they drop it.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use delver_config::ToolDescriptor;
use delver_core::error::{RegistryLoadError, ToolError};
use delver_core::provider::ToolDefinition;
use delver_core::tool::{ContentExtractor, SearchTool, Tool, ToolCall, ToolResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::calculator::Calculator;
use crate::content_extractor::PageExtractor;
use crate::web_search::DuckDuckGoSearch;
use crate::wikipedia::WikipediaSearch;

/// Constructor for one tool kind: `(registry name, descriptor) -> tool`.
pub type ToolFactory =
    Arc<dyn Fn(&str, &ToolDescriptor) -> Result<LoadedTool, RegistryLoadError> + Send + Sync>;

/// An instantiated tool and the shapes it supports.
#[derive(Clone)]
pub struct LoadedTool {
    pub name: String,
    pub description: String,
    pub search: Option<Arc<dyn SearchTool>>,
    pub extractor: Option<Arc<dyn ContentExtractor>>,
    pub callable: Option<Arc<dyn Tool>>,
}

impl LoadedTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            search: None,
            extractor: None,
            callable: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchTool>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_callable(mut self, callable: Arc<dyn Tool>) -> Self {
        self.callable = Some(callable);
        self
    }

    pub fn is_callable(&self) -> bool {
        self.callable.is_some()
    }
}

impl std::fmt::Debug for LoadedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedTool")
            .field("name", &self.name)
            .field("search", &self.search.is_some())
            .field("extractor", &self.extractor.is_some())
            .field("callable", &self.callable.is_some())
            .finish()
    }
}

/// The closed `kind -> constructor` table consulted at load time.
#[derive(Clone, Default)]
pub struct FactoryTable {
    factories: HashMap<String, ToolFactory>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in kinds: `web_search`, `wikipedia`, `content_extractor`.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.register("web_search", |name, descriptor| {
            let tool = Arc::new(DuckDuckGoSearch::from_descriptor(name, descriptor)?);
            Ok(LoadedTool::new(name, &descriptor.description)
                .with_search(tool.clone())
                .with_callable(tool))
        });
        table.register("wikipedia", |name, descriptor| {
            let tool = Arc::new(WikipediaSearch::from_descriptor(name, descriptor)?);
            Ok(LoadedTool::new(name, &descriptor.description)
                .with_search(tool.clone())
                .with_callable(tool))
        });
        table.register("content_extractor", |name, descriptor| {
            let tool = Arc::new(PageExtractor::from_descriptor(name, descriptor)?);
            Ok(LoadedTool::new(name, &descriptor.description)
                .with_extractor(tool.clone())
                .with_callable(tool))
        });
        table.register("calculator", |name, descriptor| {
            let tool = Arc::new(Calculator::from_descriptor(name, descriptor));
            Ok(LoadedTool::new(name, &descriptor.description).with_callable(tool))
        });
        table
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, &ToolDescriptor) -> Result<LoadedTool, RegistryLoadError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    fn instantiate(
        &self,
        name: &str,
        descriptor: &ToolDescriptor,
    ) -> Result<LoadedTool, RegistryLoadError> {
        if descriptor.factory.trim().is_empty() {
            return Err(RegistryLoadError::MissingFactory {
                tool: name.to_string(),
            });
        }
        let factory =
            self.factories
                .get(&descriptor.factory)
                .ok_or_else(|| RegistryLoadError::UnknownFactory {
                    tool: name.to_string(),
                    factory: descriptor.factory.clone(),
                })?;
        factory(name, descriptor)
    }
}

/// Load state of one declared tool, for display.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub factory: String,
    pub enabled: bool,
    pub loaded: bool,
    pub callable: bool,
    pub description: String,
    pub config: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An immutable view of the registry at one point in time.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    tools: BTreeMap<String, LoadedTool>,
    status: Vec<ToolStatus>,
}

impl RegistrySnapshot {
    fn build(factories: &FactoryTable, config: &BTreeMap<String, ToolDescriptor>) -> Self {
        let mut tools = BTreeMap::new();
        let mut status = Vec::with_capacity(config.len());

        for (name, descriptor) in config {
            let mut entry = ToolStatus {
                name: name.clone(),
                factory: descriptor.factory.clone(),
                enabled: descriptor.enabled,
                loaded: false,
                callable: false,
                description: descriptor.description.clone(),
                config: descriptor.config.clone(),
                error: None,
            };

            if !descriptor.enabled {
                debug!(tool = %name, "Tool disabled in configuration");
                status.push(entry);
                continue;
            }

            match factories.instantiate(name, descriptor) {
                Ok(tool) => {
                    info!(tool = %name, kind = %descriptor.factory, "Loaded tool");
                    entry.loaded = true;
                    entry.callable = tool.is_callable();
                    tools.insert(name.clone(), tool);
                }
                Err(e) => {
                    warn!(tool = %name, error = %e, "Failed to load tool");
                    entry.error = Some(e.to_string());
                }
            }
            status.push(entry);
        }

        Self { tools, status }
    }

    pub fn get(&self, name: &str) -> Option<&LoadedTool> {
        self.tools.get(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of successfully loaded tools, sorted.
    pub fn list_enabled(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// The search capability of `name`, when loaded and search-capable.
    pub fn search(&self, name: &str) -> Option<Arc<dyn SearchTool>> {
        self.tools.get(name).and_then(|t| t.search.clone())
    }

    pub fn extractor(&self, name: &str) -> Option<Arc<dyn ContentExtractor>> {
        self.tools.get(name).and_then(|t| t.extractor.clone())
    }

    pub fn status(&self) -> &[ToolStatus] {
        &self.status
    }

    pub fn callable_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().filter_map(|t| t.callable.clone()).collect()
    }
}

/// The shared, reloadable set of enabled tools.
pub struct ToolRegistry {
    factories: FactoryTable,
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl ToolRegistry {
    /// Load every enabled descriptor using the built-in factory table.
    pub fn load(config: &BTreeMap<String, ToolDescriptor>) -> Self {
        Self::with_factories(FactoryTable::builtin(), config)
    }

    pub fn with_factories(factories: FactoryTable, config: &BTreeMap<String, ToolDescriptor>) -> Self {
        let snapshot = RegistrySnapshot::build(&factories, config);
        info!(count = snapshot.tools.len(), "Tool registry loaded");
        Self {
            factories,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current tool set. Stays valid across a concurrent reload.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild every tool from `config`, then swap the new set in.
    pub fn reload(&self, config: &BTreeMap<String, ToolDescriptor>) {
        let fresh = Arc::new(RegistrySnapshot::build(&self.factories, config));
        let count = fresh.tools.len();
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = fresh;
        info!(count, "Tool registry reloaded");
    }

    pub fn get(&self, name: &str) -> Option<LoadedTool> {
        self.snapshot().get(name).cloned()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.snapshot().is_enabled(name)
    }

    pub fn list_enabled(&self) -> Vec<String> {
        self.snapshot().list_enabled()
    }

    /// Every declared tool with its load state.
    pub fn status(&self) -> Vec<ToolStatus> {
        self.snapshot().status().to_vec()
    }

    pub fn callable_tools(&self) -> Vec<Arc<dyn Tool>> {
        self.snapshot().callable_tools()
    }

    /// Definitions of all callable tools, for sending to the model.
    ///
    /// Tools are advertised under their registry name, which is also the
    /// name [`execute`](Self::execute) resolves.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.snapshot()
            .tools
            .iter()
            .filter_map(|(name, tool)| {
                tool.callable.as_ref().map(|c| ToolDefinition {
                    name: name.clone(),
                    ..c.to_definition()
                })
            })
            .collect()
    }

    /// Execute a model-issued tool call.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .snapshot()
            .get(&call.name)
            .and_then(|t| t.callable.clone())
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        debug!(tool = %call.name, "Executing tool call");
        let mut result = tool.execute(call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }
}

/// Typed access to a descriptor's free-form `config` table.
pub(crate) struct Settings<'a> {
    tool: &'a str,
    config: &'a serde_json::Map<String, serde_json::Value>,
}

impl<'a> Settings<'a> {
    pub(crate) fn new(tool: &'a str, descriptor: &'a ToolDescriptor) -> Self {
        Self {
            tool,
            config: &descriptor.config,
        }
    }

    pub(crate) fn u64_or(&self, key: &str, default: u64) -> Result<u64, RegistryLoadError> {
        match self.config.get(key) {
            None => Ok(default),
            Some(value) => value.as_u64().ok_or_else(|| self.invalid(key, "a non-negative integer")),
        }
    }

    pub(crate) fn string_or(&self, key: &str, default: &str) -> Result<String, RegistryLoadError> {
        match self.config.get(key) {
            None => Ok(default.to_string()),
            Some(value) => value
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| self.invalid(key, "a string")),
        }
    }

    fn invalid(&self, key: &str, expected: &str) -> RegistryLoadError {
        RegistryLoadError::InvalidConfig {
            tool: self.tool.to_string(),
            reason: format!("'{key}' must be {expected}"),
        }
    }
}

/// Shared HTTP client builder for the retrieval tools.
pub(crate) fn http_client(
    tool: &str,
    timeout_secs: u64,
    user_agent: &str,
) -> Result<reqwest::Client, RegistryLoadError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .map_err(|e| RegistryLoadError::InitFailed {
            tool: tool.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use delver_core::evidence::SearchHit;

    struct FixedSearch;

    #[async_trait]
    impl SearchTool for FixedSearch {
        async fn search(&self, query: &str, _max_results: usize) -> Vec<SearchHit> {
            vec![SearchHit::new(query, "snippet", "https://example.com")]
        }
    }

    fn table_with_fixed() -> FactoryTable {
        let mut table = FactoryTable::builtin();
        table.register("fixed", |name, descriptor| {
            Ok(LoadedTool::new(name, &descriptor.description).with_search(Arc::new(FixedSearch)))
        });
        table
    }

    fn config(entries: &[(&str, ToolDescriptor)]) -> BTreeMap<String, ToolDescriptor> {
        entries
            .iter()
            .map(|(name, d)| (name.to_string(), d.clone()))
            .collect()
    }

    #[test]
    fn loads_only_enabled_tools() {
        let cfg = config(&[
            ("alpha", ToolDescriptor::new("fixed", "a")),
            ("beta", ToolDescriptor::new("fixed", "b").disabled()),
        ]);
        let registry = ToolRegistry::with_factories(table_with_fixed(), &cfg);

        assert!(registry.is_enabled("alpha"));
        assert!(!registry.is_enabled("beta"));
        assert!(registry.get("beta").is_none());
        assert_eq!(registry.list_enabled(), vec!["alpha".to_string()]);

        let status = registry.status();
        assert_eq!(status.len(), 2);
        assert!(!status.iter().find(|s| s.name == "beta").unwrap().loaded);
    }

    #[test]
    fn unknown_factory_is_excluded_without_affecting_others() {
        let cfg = config(&[
            ("good", ToolDescriptor::new("fixed", "")),
            ("bad", ToolDescriptor::new("no_such_kind", "")),
        ]);
        let registry = ToolRegistry::with_factories(table_with_fixed(), &cfg);

        assert!(registry.is_enabled("good"));
        assert!(!registry.is_enabled("bad"));
        let bad = registry.status().into_iter().find(|s| s.name == "bad").unwrap();
        assert!(bad.error.unwrap().contains("no_such_kind"));
    }

    #[test]
    fn invalid_setting_is_a_load_error() {
        let cfg = config(&[(
            "web_search",
            ToolDescriptor::new("web_search", "").with_setting("timeout", "soon"),
        )]);
        let registry = ToolRegistry::load(&cfg);
        assert!(!registry.is_enabled("web_search"));
    }

    #[test]
    fn builtin_tools_are_searchable_and_callable() {
        let registry = ToolRegistry::load(&delver_config::AppConfig::default().tools);
        let snapshot = registry.snapshot();

        assert!(snapshot.search("web_search").is_some());
        assert!(snapshot.search("wikipedia").is_some());
        assert!(snapshot.extractor("content_extractor").is_some());
        assert!(snapshot.search("content_extractor").is_none());
        assert!(snapshot.search("calculator").is_none());
        assert!(registry.get("calculator").unwrap().is_callable());
        assert_eq!(registry.definitions().len(), 4);
    }

    #[tokio::test]
    async fn calculator_is_reachable_through_execute() {
        let registry = ToolRegistry::load(&delver_config::AppConfig::default().tools);
        let call = ToolCall {
            id: "call_calc".into(),
            name: "calculator".into(),
            arguments: serde_json::json!({"expression": "15 * 23"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "Calculation result: 15 * 23 = 345");
    }

    #[test]
    fn descriptor_without_factory_fails_alone() {
        let cfg = config(&[
            ("web_search", ToolDescriptor::new("web_search", "")),
            ("broken", ToolDescriptor::new("", "no factory")),
        ]);
        let registry = ToolRegistry::with_factories(FactoryTable::builtin(), &cfg);

        assert!(registry.is_enabled("web_search"));
        assert!(registry.snapshot().search("web_search").is_some());
        assert!(!registry.is_enabled("broken"));
        assert!(registry.get("broken").is_none());

        let broken = registry.status().into_iter().find(|s| s.name == "broken").unwrap();
        assert!(broken.enabled);
        assert!(!broken.loaded);
        assert_eq!(broken.error.as_deref(), Some("Tool 'broken' does not name a factory"));
    }

    #[test]
    fn reload_swaps_tool_set_but_old_snapshot_survives() {
        let mut cfg = config(&[("alpha", ToolDescriptor::new("fixed", ""))]);
        let registry = ToolRegistry::with_factories(table_with_fixed(), &cfg);
        let before = registry.snapshot();

        cfg.insert("alpha".into(), ToolDescriptor::new("fixed", "").disabled());
        registry.reload(&cfg);

        assert!(!registry.is_enabled("alpha"));
        assert!(registry.get("alpha").is_none());
        assert!(registry.definitions().is_empty());
        assert!(before.is_enabled("alpha"));
    }

    #[tokio::test]
    async fn execute_unknown_tool_is_not_found() {
        let registry = ToolRegistry::with_factories(FactoryTable::new(), &BTreeMap::new());
        let call = ToolCall {
            id: "call_1".into(),
            name: "missing".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn non_callable_tool_is_not_executable() {
        let cfg = config(&[("alpha", ToolDescriptor::new("fixed", ""))]);
        let registry = ToolRegistry::with_factories(table_with_fixed(), &cfg);
        let call = ToolCall {
            id: "c".into(),
            name: "alpha".into(),
            arguments: serde_json::json!({"query": "x"}),
        };
        assert!(registry.execute(&call).await.is_err());
        assert!(registry.definitions().is_empty());
    }
}
