//! Web search through DuckDuckGo's HTML endpoint (no API key needed).

use async_trait::async_trait;
use delver_config::ToolDescriptor;
use delver_core::error::{RegistryLoadError, ToolError};
use delver_core::evidence::SearchHit;
use delver_core::tool::{SearchTool, Tool, ToolResult};
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::html::element_text;
use crate::registry::{Settings, http_client};
use crate::{BROWSER_USER_AGENT, render_hits};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_DESCRIPTION: &str =
    "Search the web for current information. Returns titles, snippets and URLs.";

pub struct DuckDuckGoSearch {
    name: String,
    description: String,
    base_url: String,
    max_results_default: usize,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    /// Settings: `max_results_default` (5), `timeout` seconds (10), `base_url`.
    pub fn from_descriptor(name: &str, descriptor: &ToolDescriptor) -> Result<Self, RegistryLoadError> {
        let settings = Settings::new(name, descriptor);
        let timeout = settings.u64_or("timeout", 10)?;
        let max_results_default = settings.u64_or("max_results_default", 5)? as usize;
        let base_url = settings.string_or("base_url", DEFAULT_BASE_URL)?;

        let description = if descriptor.description.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            descriptor.description.clone()
        };

        Ok(Self {
            name: name.to_string(),
            description,
            base_url,
            max_results_default,
            client: http_client(name, timeout, BROWSER_USER_AGENT)?,
        })
    }

    async fn fetch(&self, query: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl SearchTool for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        info!(tool = %self.name, query, "Searching the web");
        match self.fetch(query).await {
            Ok(html) => {
                let hits: Vec<SearchHit> = parse_results(&html).into_iter().take(max_results).collect();
                info!(tool = %self.name, count = hits.len(), "Web search finished");
                hits
            }
            Err(e) => {
                warn!(tool = %self.name, error = %e, "Web search failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": format!("Maximum number of results (default {})", self.max_results_default)
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let max_results = arguments["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(self.max_results_default);

        let hits = self.search(query, max_results).await;
        let output = if hits.is_empty() {
            format!("No web results found for: {query}")
        } else {
            render_hits(&hits)
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
            data: serde_json::to_value(&hits).ok(),
        })
    }
}

/// Extract organic results from a DuckDuckGo HTML results page.
pub fn parse_results(html: &str) -> Vec<SearchHit> {
    let (Ok(body), Ok(link), Ok(snippet), Ok(display_url)) = (
        Selector::parse(".result__body"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
        Selector::parse(".result__url"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&body)
        .filter_map(|result| {
            let anchor = result.select(&link).next()?;
            let title = element_text(anchor);
            if title.is_empty() {
                return None;
            }

            let url = anchor
                .value()
                .attr("href")
                .filter(|href| !href.is_empty())
                .map(unwrap_redirect)
                .or_else(|| {
                    result.select(&display_url).next().map(|shown| {
                        let text = element_text(shown);
                        if text.starts_with("http") || text.is_empty() {
                            text
                        } else {
                            format!("https://{text}")
                        }
                    })
                })
                .unwrap_or_default();

            // Sponsored results point back at DuckDuckGo's click tracker.
            if url.contains("duckduckgo.com/y.js") {
                return None;
            }

            let summary = result
                .select(&snippet)
                .next()
                .map(element_text)
                .unwrap_or_default();

            Some(SearchHit::new(title, summary, url))
        })
        .collect()
}

/// Resolve `//duckduckgo.com/l/?uddg=<target>` links to their target.
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    reqwest::Url::parse(&absolute)
        .ok()
        .filter(|url| url.path() == "/l/")
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}
