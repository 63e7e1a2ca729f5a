//! Query analysis: turn a free-form question into a [`RetrievalPlan`].

use std::collections::HashMap;
use std::sync::Arc;

use delver_core::plan::{DEFAULT_ANSWER_TYPE, RetrievalPlan};
use tracing::{info, warn};

use crate::gateway::LlmGateway;

pub const KEY_NEEDS_WEB: &str = "NEEDS_WEB_SEARCH";
pub const KEY_NEEDS_ENCYCLOPEDIA: &str = "NEEDS_WIKIPEDIA";
pub const KEY_SEARCH_TERMS: &str = "SEARCH_TERMS";
pub const KEY_ANSWER_TYPE: &str = "ANSWER_TYPE";

pub struct QueryAnalyzer {
    gateway: Arc<LlmGateway>,
}

impl QueryAnalyzer {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Ask the model for a plan. Never fails: any problem yields
    /// [`RetrievalPlan::fallback`].
    pub async fn analyze(&self, query: &str) -> RetrievalPlan {
        info!("Analyzing query");
        let response = match self.gateway.complete(&analysis_prompt(query)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Query analysis failed, using fallback plan");
                return RetrievalPlan::fallback(query);
            }
        };

        match parse_analysis(&response) {
            Some(plan) => {
                info!(
                    web = plan.needs_web(),
                    wikipedia = plan.needs_encyclopedia(),
                    terms = ?plan.search_terms(),
                    "Query analysis complete"
                );
                plan
            }
            None => {
                warn!(response = %response, "Unparseable analysis, using fallback plan");
                RetrievalPlan::fallback(query)
            }
        }
    }
}

pub fn analysis_prompt(query: &str) -> String {
    format!(
        r#"Analyze this user query and determine:
1. Does it require current/recent information from the internet?
2. Does it require factual information that might be found on Wikipedia?
3. What specific search terms would be most effective?
4. What type of answer format would be most helpful?

Query: "{query}"

Respond in this format:
{KEY_NEEDS_WEB}: yes/no
{KEY_NEEDS_ENCYCLOPEDIA}: yes/no
{KEY_SEARCH_TERMS}: [comma-separated list of search terms]
{KEY_ANSWER_TYPE}: [brief description of expected answer format]"#
    )
}

/// Parse `KEY: value` lines. `None` when a required key is missing or no
/// search term survives cleanup.
pub fn parse_analysis(response: &str) -> Option<RetrievalPlan> {
    let fields: HashMap<String, &str> = response
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (normalize_key(key), value.trim()))
        .collect();

    let needs_web = parse_flag(fields.get(KEY_NEEDS_WEB)?);
    let needs_encyclopedia = parse_flag(fields.get(KEY_NEEDS_ENCYCLOPEDIA)?);
    let terms = parse_terms(fields.get(KEY_SEARCH_TERMS)?);
    let answer_type = fields
        .get(KEY_ANSWER_TYPE)
        .map(|v| strip_wrapping(v))
        .unwrap_or(DEFAULT_ANSWER_TYPE);

    RetrievalPlan::new(needs_web, needs_encyclopedia, terms, answer_type)
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_start_matches(['-', '*', ' '])
        .trim()
        .to_ascii_uppercase()
        .replace(' ', "_")
}

fn parse_flag(value: &str) -> bool {
    let value = strip_wrapping(value);
    value.eq_ignore_ascii_case("yes") || value.eq_ignore_ascii_case("true")
}

fn parse_terms(value: &str) -> Vec<String> {
    strip_wrapping(value)
        .split(',')
        .map(strip_wrapping)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim whitespace, brackets and quotes around a value.
fn strip_wrapping(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '"' | '\''))
}
