//! Retrieval plans: what the query analyzer asks the gatherer to do.

use serde::{Deserialize, Serialize};

/// Answer shape used when the model did not describe one.
pub const DEFAULT_ANSWER_TYPE: &str = "comprehensive answer";

/// A structured, immutable retrieval plan.
///
/// `search_terms` is never empty: [`RetrievalPlan::new`] rejects an empty
/// list and [`RetrievalPlan::fallback`] always carries the original query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalPlan {
    needs_web: bool,
    needs_encyclopedia: bool,
    search_terms: Vec<String>,
    answer_type: String,
}

impl RetrievalPlan {
    /// Build a plan, dropping blank terms. Returns `None` when no term is left.
    pub fn new(
        needs_web: bool,
        needs_encyclopedia: bool,
        search_terms: Vec<String>,
        answer_type: impl Into<String>,
    ) -> Option<Self> {
        let search_terms: Vec<String> = search_terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if search_terms.is_empty() {
            return None;
        }
        let answer_type = answer_type.into();
        let answer_type = if answer_type.trim().is_empty() {
            DEFAULT_ANSWER_TYPE.to_string()
        } else {
            answer_type.trim().to_string()
        };
        Some(Self {
            needs_web,
            needs_encyclopedia,
            search_terms,
            answer_type,
        })
    }

    /// The plan used whenever analysis fails: web search on the raw query.
    pub fn fallback(query: &str) -> Self {
        Self {
            needs_web: true,
            needs_encyclopedia: false,
            search_terms: vec![query.to_string()],
            answer_type: DEFAULT_ANSWER_TYPE.to_string(),
        }
    }

    pub fn needs_web(&self) -> bool {
        self.needs_web
    }

    pub fn needs_encyclopedia(&self) -> bool {
        self.needs_encyclopedia
    }

    pub fn search_terms(&self) -> &[String] {
        &self.search_terms
    }

    pub fn answer_type(&self) -> &str {
        &self.answer_type
    }

    /// The term actually sent to retrieval tools. Later terms are not used.
    ///
    /// `None` when the only term is blank (a fallback plan for an empty query).
    pub fn primary_term(&self) -> Option<&str> {
        self.search_terms
            .first()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}
