//! Evidence records: normalized units of retrieved information.

use serde::{Deserialize, Serialize};

/// One raw hit returned by a search tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    /// Empty when the backend did not report a link.
    #[serde(default)]
    pub url: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
        }
    }
}

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Web,
    Encyclopedia,
}

impl EvidenceSource {
    /// Label shown to the model in synthesis prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Web => "Web",
            Self::Encyclopedia => "Wikipedia",
        }
    }
}

impl std::fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A gathered, read-only piece of evidence.
///
/// `snippet` is always present. `full_content` is only filled for the first
/// few web results, and holds a diagnostic message when extraction failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub source: EvidenceSource,
    pub title: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl EvidenceRecord {
    /// Normalize a search hit; an empty URL becomes `None`.
    pub fn from_hit(source: EvidenceSource, hit: SearchHit) -> Self {
        let url = Some(hit.url.trim().to_string()).filter(|u| !u.is_empty());
        Self {
            source,
            title: hit.title,
            snippet: hit.snippet,
            full_content: None,
            url,
        }
    }
}
