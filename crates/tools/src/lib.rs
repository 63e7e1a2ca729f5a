//! Retrieval tools for Delver.
//!
//! Three built-in tools back the research pipeline: DuckDuckGo web search,
//! Wikipedia lookup and page content extraction. Each implements its direct
//! capability (`SearchTool` / `ContentExtractor`) as well as the
//! machine-invocable `Tool` interface. A fourth, the calculator, is only
//! callable and serves tool-calling agents. The [`ToolRegistry`] builds them from
//! `[tools.*]` descriptors and can be reloaded at runtime.

pub mod calculator;
pub mod content_extractor;
pub mod html;
pub mod registry;
pub mod web_search;
pub mod wikipedia;

use delver_core::evidence::SearchHit;

pub use calculator::Calculator;
pub use content_extractor::PageExtractor;
pub use registry::{FactoryTable, LoadedTool, RegistrySnapshot, ToolFactory, ToolRegistry, ToolStatus};
pub use web_search::DuckDuckGoSearch;
pub use wikipedia::WikipediaSearch;

pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Numbered text blocks, as handed back to a tool-calling model.
pub(crate) fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let url = if hit.url.is_empty() { "N/A" } else { hit.url.as_str() };
            format!("{}. {}\n   {}\n   URL: {}", i + 1, hit.title, hit.snippet, url)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
