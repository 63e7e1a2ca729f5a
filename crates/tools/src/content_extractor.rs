//! Page content extraction: fetch a URL and keep its readable text.

use async_trait::async_trait;
use delver_config::ToolDescriptor;
use delver_core::error::{RegistryLoadError, ToolError};
use delver_core::tool::{ContentExtractor, Tool, ToolResult};
use tracing::{info, warn};

use crate::BROWSER_USER_AGENT;
use crate::html::{page_text, truncate_with_ellipsis};
use crate::registry::{Settings, http_client};

const DEFAULT_DESCRIPTION: &str =
    "Extract the main text content from a web page URL. Use after a web search to read a page in full.";

pub struct PageExtractor {
    name: String,
    description: String,
    max_length_default: usize,
    client: reqwest::Client,
}

impl PageExtractor {
    /// Settings: `max_length_default` (2000), `timeout` seconds (10), `user_agent`.
    pub fn from_descriptor(name: &str, descriptor: &ToolDescriptor) -> Result<Self, RegistryLoadError> {
        let settings = Settings::new(name, descriptor);
        let timeout = settings.u64_or("timeout", 10)?;
        let user_agent = settings.string_or("user_agent", BROWSER_USER_AGENT)?;

        Ok(Self {
            name: name.to_string(),
            description: if descriptor.description.is_empty() {
                DEFAULT_DESCRIPTION.to_string()
            } else {
                descriptor.description.clone()
            },
            max_length_default: settings.u64_or("max_length_default", 2000)? as usize,
            client: http_client(name, timeout, &user_agent)?,
        })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, reqwest::Error> {
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(page_text(&html))
    }
}

#[async_trait]
impl ContentExtractor for PageExtractor {
    async fn extract(&self, url: &str, max_length: usize) -> String {
        info!(tool = %self.name, url, "Extracting page content");
        match self.fetch_text(url).await {
            Ok(text) => {
                let text = truncate_with_ellipsis(&text, max_length);
                info!(tool = %self.name, url, chars = text.chars().count(), "Extracted page content");
                text
            }
            Err(e) => {
                warn!(tool = %self.name, url, error = %e, "Content extraction failed");
                format!("Failed to extract content from {url}: {e}")
            }
        }
    }
}

#[async_trait]
impl Tool for PageExtractor {
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
                "url": {
                    "type": "string",
                    "description": "The page URL to read"
                },
                "max_length": {
                    "type": "integer",
                    "description": format!("Maximum characters to return (default {})", self.max_length_default)
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;
        let max_length = arguments["max_length"]
            .as_u64()
            .map(|n| n as usize)
            .unwrap_or(self.max_length_default);

        let output = self.extract(url, max_length).await;
        Ok(ToolResult {
            call_id: String::new(),
            success: !output.starts_with("Failed to extract content from"),
            output,
            data: None,
        })
    }
}
