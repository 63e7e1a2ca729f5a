//! Sufficiency evaluation: does the draft need another research pass?

use std::sync::Arc;

use tracing::{info, warn};

use crate::gateway::LlmGateway;

/// Verdict requesting another pass; matched case-sensitively.
pub const NEEDS_MORE_RESEARCH: &str = "NEEDS_MORE_RESEARCH";
pub const SUFFICIENT: &str = "SUFFICIENT";

/// Characters of the draft shown to the evaluator.
pub const DRAFT_PREVIEW_CHARS: usize = 500;

pub struct SufficiencyEvaluator {
    gateway: Arc<LlmGateway>,
}

impl SufficiencyEvaluator {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// `true` only when the model explicitly asks for more research.
    pub async fn should_iterate(&self, query: &str, answer: &str) -> bool {
        match self.gateway.complete(&evaluation_prompt(query, answer)).await {
            Ok(verdict) => {
                let iterate = verdict.contains(NEEDS_MORE_RESEARCH);
                info!(iterate, verdict = %verdict.trim(), "Evaluated answer");
                iterate
            }
            Err(e) => {
                warn!(error = %e, "Evaluation failed, treating answer as sufficient");
                false
            }
        }
    }
}

pub fn evaluation_prompt(query: &str, answer: &str) -> String {
    let preview: String = answer.chars().take(DRAFT_PREVIEW_CHARS).collect();
    format!(
        r#"Evaluate whether the current answer adequately addresses the user's query, or if additional research would be beneficial.

Original Query: "{query}"

Current Answer: "{preview}..."

Does this answer:
1. Fully address all aspects of the user's query?
2. Provide sufficient detail and accuracy?
3. Include relevant current information if needed?

Respond with only "{SUFFICIENT}" or "{NEEDS_MORE_RESEARCH}" followed by a brief reason."#
    )
}
