//! Shared test doubles: scripted providers and recording tools.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use delver_config::ToolDescriptor;
use delver_core::error::{GatewayError, ToolError};
use delver_core::evidence::SearchHit;
use delver_core::message::{Message, MessageToolCall};
use delver_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use delver_core::tool::{ContentExtractor, SearchTool, Tool, ToolResult};
use delver_tools::{FactoryTable, LoadedTool, ToolRegistry};

/// A mock provider that returns a sequence of scripted responses.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| make_text_response(t)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Text of the last user message of every request so far.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, GatewayError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[index].clone())
    }
}

/// A provider whose every call fails with a network error.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, GatewayError> {
        Err(GatewayError::Network("connection refused".into()))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut response = make_text_response(thought);
    response.message.tool_calls = tool_calls;
    response
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}

/// A search tool returning fixed hits and recording `(query, max_results)`.
#[derive(Default)]
pub struct RecordingSearch {
    hits: Vec<SearchHit>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl RecordingSearch {
    pub fn returning(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchTool for RecordingSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        self.calls.lock().unwrap().push((query.to_string(), max_results));
        // Ignores the limit on purpose so callers' caps are exercised.
        self.hits.clone()
    }
}

#[async_trait]
impl Tool for RecordingSearch {
    fn name(&self) -> &str {
        "recording_search"
    }

    fn description(&self) -> &str {
        "Mock search"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}, "required": ["query"]})
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let hits = self.search(query, 5).await;
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: hits
                .iter()
                .map(|h| format!("{}: {}", h.title, h.snippet))
                .collect::<Vec<_>>()
                .join("\n"),
            data: None,
        })
    }
}

/// An extractor that returns `"content of {url}"` and records each URL.
#[derive(Default)]
pub struct RecordingExtractor {
    calls: Mutex<Vec<(String, usize)>>,
}

impl RecordingExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentExtractor for RecordingExtractor {
    async fn extract(&self, url: &str, max_length: usize) -> String {
        self.calls.lock().unwrap().push((url.to_string(), max_length));
        format!("content of {url}")
    }
}

/// A registry whose `web_search`, `wikipedia` and `content_extractor`
/// entries are the given mocks. `None` leaves the tool disabled.
pub fn mock_registry(
    web: Option<Arc<RecordingSearch>>,
    wiki: Option<Arc<RecordingSearch>>,
    extractor: Option<Arc<RecordingExtractor>>,
) -> Arc<ToolRegistry> {
    let mut table = FactoryTable::new();
    let mut config = BTreeMap::new();

    if let Some(web) = web {
        table.register("mock_web", move |name, d| {
            Ok(LoadedTool::new(name, &d.description)
                .with_search(web.clone())
                .with_callable(web.clone()))
        });
        config.insert("web_search".to_string(), ToolDescriptor::new("mock_web", "web"));
    }
    if let Some(wiki) = wiki {
        table.register("mock_wiki", move |name, d| {
            Ok(LoadedTool::new(name, &d.description).with_search(wiki.clone()))
        });
        config.insert("wikipedia".to_string(), ToolDescriptor::new("mock_wiki", "wiki"));
    }
    if let Some(extractor) = extractor {
        table.register("mock_extractor", move |name, d| {
            Ok(LoadedTool::new(name, &d.description).with_extractor(extractor.clone()))
        });
        config.insert(
            "content_extractor".to_string(),
            ToolDescriptor::new("mock_extractor", "extract"),
        );
    }

    Arc::new(ToolRegistry::with_factories(table, &config))
}

pub fn hit(n: usize) -> SearchHit {
    SearchHit::new(
        format!("Result {n}"),
        format!("Snippet {n}"),
        format!("https://example.com/{n}"),
    )
}
