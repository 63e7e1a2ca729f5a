//! Encyclopedic lookup against Wikipedia.
//!
//! Titles come from the MediaWiki search API; each title is then resolved
//! through the REST summary endpoint. Disambiguation pages are followed to
//! their first linked article; titles that still do not resolve are skipped.

use async_trait::async_trait;
use delver_config::ToolDescriptor;
use delver_core::error::{RegistryLoadError, ToolError};
use delver_core::evidence::SearchHit;
use delver_core::tool::{SearchTool, Tool, ToolResult};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::registry::{Settings, http_client};
use crate::render_hits;

const DEFAULT_DESCRIPTION: &str =
    "Search Wikipedia for factual and encyclopedic information about people, places and concepts.";
const USER_AGENT: &str = concat!("delver/", env!("CARGO_PKG_VERSION"));

pub struct WikipediaSearch {
    name: String,
    description: String,
    base_url: String,
    max_results_default: usize,
    summary_sentences: usize,
    client: reqwest::Client,
}

/// What the summary endpoint said about one title.
#[derive(Debug, PartialEq)]
enum Summary {
    Article(SearchHit),
    Disambiguation,
    Missing,
}

impl WikipediaSearch {
    /// Settings: `max_results_default` (3), `summary_sentences` (3),
    /// `language` (`en`), `timeout` seconds (10), `base_url`.
    pub fn from_descriptor(name: &str, descriptor: &ToolDescriptor) -> Result<Self, RegistryLoadError> {
        let settings = Settings::new(name, descriptor);
        let language = settings.string_or("language", "en")?;
        let base_url = settings.string_or("base_url", &format!("https://{language}.wikipedia.org"))?;
        let timeout = settings.u64_or("timeout", 10)?;

        Ok(Self {
            name: name.to_string(),
            description: if descriptor.description.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                descriptor.description.clone()
            },
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results_default: settings.u64_or("max_results_default", 3)? as usize,
            summary_sentences: settings.u64_or("summary_sentences", 3)? as usize,
            client: http_client(name, timeout, USER_AGENT)?,
        })
    }

    async fn api(&self, params: &[(&str, &str)]) -> Result<Value, reqwest::Error> {
        self.client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>, reqwest::Error> {
        let limit = limit.to_string();
        let body = self
            .api(&[("list", "search"), ("srsearch", query), ("srlimit", limit.as_str())])
            .await?;
        Ok(parse_search_titles(&body))
    }

    async fn first_link(&self, title: &str) -> Result<Option<String>, reqwest::Error> {
        let body = self
            .api(&[
                ("prop", "links"),
                ("titles", title),
                ("plnamespace", "0"),
                ("pllimit", "1"),
            ])
            .await?;
        Ok(parse_first_link(&body))
    }

    async fn summary(&self, title: &str) -> Result<Summary, reqwest::Error> {
        let Some(url) = summary_url(&self.base_url, title) else {
            return Ok(Summary::Missing);
        };

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Summary::Missing);
        }
        let body: Value = response.error_for_status()?.json().await?;
        Ok(parse_summary(&body, self.summary_sentences))
    }

    async fn resolve(&self, title: &str) -> Result<Option<SearchHit>, reqwest::Error> {
        match self.summary(title).await? {
            Summary::Article(hit) => Ok(Some(hit)),
            Summary::Missing => Ok(None),
            Summary::Disambiguation => {
                let Some(target) = self.first_link(title).await? else {
                    return Ok(None);
                };
                debug!(tool = %self.name, from = title, to = %target, "Following disambiguation");
                match self.summary(&target).await? {
                    Summary::Article(hit) => Ok(Some(hit)),
                    _ => Ok(None),
                }
            }
        }
    }
}

#[async_trait]
impl SearchTool for WikipediaSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        info!(tool = %self.name, query, "Searching Wikipedia");

        let titles = match self.search_titles(query, max_results).await {
            Ok(titles) => titles,
            Err(e) => {
                warn!(tool = %self.name, error = %e, "Wikipedia search failed");
                return Vec::new();
            }
        };

        let mut hits = Vec::with_capacity(titles.len());
        for title in titles.iter().take(max_results) {
            match self.resolve(title).await {
                Ok(Some(hit)) => hits.push(hit),
                Ok(None) => debug!(tool = %self.name, title = %title, "Skipping unresolvable title"),
                Err(e) => debug!(tool = %self.name, title = %title, error = %e, "Skipping title"),
            }
        }

        info!(tool = %self.name, count = hits.len(), "Wikipedia search finished");
        hits
    }
}

#[async_trait]
impl Tool for WikipediaSearch {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Topic to look up"
                },
                "max_results": {
                    "type": "integer",
                    "description": format!("Maximum number of articles (default {})", self.max_results_default)
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let max_results = arguments["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(self.max_results_default);

        let hits = self.search(query, max_results).await;
        let output = if hits.is_empty() {
            format!("No Wikipedia results found for: {query}")
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

fn summary_url(base_url: &str, title: &str) -> Option<Url> {
    let mut url = Url::parse(&format!("{base_url}/api/rest_v1/page/summary")).ok()?;
    url.path_segments_mut()
        .ok()?
        .push(&title.replace(' ', "_"));
    Some(url)
}

fn parse_search_titles(body: &Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_first_link(body: &Value) -> Option<String> {
    body["query"]["pages"]
        .as_object()?
        .values()
        .find_map(|page| page["links"].as_array()?.first()?["title"].as_str())
        .map(str::to_string)
}

fn parse_summary(body: &Value, sentences: usize) -> Summary {
    match body["type"].as_str() {
        Some("disambiguation") => return Summary::Disambiguation,
        Some(_) => {}
        None => return Summary::Missing,
    }

    let Some(title) = body["title"].as_str() else {
        return Summary::Missing;
    };
    let extract = body["extract"].as_str().unwrap_or_default();
    let url = body["content_urls"]["desktop"]["page"]
        .as_str()
        .unwrap_or_default();

    Summary::Article(SearchHit::new(
        title,
        first_sentences(extract, sentences),
        url,
    ))
}

/// The first `n` sentences of `text`; the whole text when `n` is 0 or the
/// text is shorter.
pub fn first_sentences(text: &str, n: usize) -> String {
    if n == 0 {
        return text.trim().to_string();
    }

    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_none_or(|(_, next)| next.is_whitespace())
        {
            seen += 1;
            if seen == n {
                return text[..i + c.len_utf8()].trim().to_string();
            }
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentences_are_trimmed() {
        let text = "Paris is the capital of France. It has 2.1 million residents! Is it big? Yes.";
        assert_eq!(first_sentences(text, 1), "Paris is the capital of France.");
        assert_eq!(
            first_sentences(text, 3),
            "Paris is the capital of France. It has 2.1 million residents! Is it big?"
        );
        assert_eq!(first_sentences(text, 10), text);
        assert_eq!(first_sentences("No terminator", 2), "No terminator");
    }

    #[test]
    fn parses_search_titles() {
        let body = json!({"query": {"search": [{"title": "Paris"}, {"title": "Paris, Texas"}]}});
        assert_eq!(parse_search_titles(&body), vec!["Paris", "Paris, Texas"]);
        assert!(parse_search_titles(&json!({"error": "x"})).is_empty());
    }

    #[test]
    fn parses_standard_summary() {
        let body = json!({
            "type": "standard",
            "title": "Paris",
            "extract": "Paris is the capital and largest city of France. More text.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Paris"}}
        });
        let Summary::Article(hit) = parse_summary(&body, 1) else {
            panic!("expected article");
        };
        assert_eq!(hit.title, "Paris");
        assert_eq!(hit.snippet, "Paris is the capital and largest city of France.");
        assert_eq!(hit.url, "https://en.wikipedia.org/wiki/Paris");
    }

    #[test]
    fn detects_disambiguation() {
        let body = json!({"type": "disambiguation", "title": "Mercury", "extract": "Mercury may refer to:"});
        assert_eq!(parse_summary(&body, 3), Summary::Disambiguation);
        assert_eq!(parse_summary(&json!({}), 3), Summary::Missing);
    }

    #[test]
    fn parses_first_link() {
        let body = json!({"query": {"pages": {"19694": {
            "title": "Mercury",
            "links": [{"ns": 0, "title": "Mercury (planet)"}]
        }}}});
        assert_eq!(parse_first_link(&body).as_deref(), Some("Mercury (planet)"));
        assert_eq!(parse_first_link(&json!({"query": {"pages": {"1": {"title": "x"}}}})), None);
    }

    #[test]
    fn summary_url_escapes_title() {
        let url = summary_url("https://en.wikipedia.org", "AC/DC band").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/AC%2FDC_band"
        );
    }

    #[test]
    fn language_selects_host() {
        let descriptor = ToolDescriptor::new("wikipedia", "").with_setting("language", "de");
        let tool = WikipediaSearch::from_descriptor("wikipedia", &descriptor).unwrap();
        assert_eq!(tool.base_url, "https://de.wikipedia.org");
        assert_eq!(tool.summary_sentences, 3);
    }

    #[tokio::test]
    async fn unreachable_backend_returns_empty() {
        let descriptor = ToolDescriptor::new("wikipedia", "")
            .with_setting("base_url", "http://127.0.0.1:9")
            .with_setting("timeout", 2);
        let tool = WikipediaSearch::from_descriptor("wikipedia", &descriptor).unwrap();
        assert!(tool.search("Paris", 2).await.is_empty());
    }
}
