//! Answer synthesis: one LLM call over the gathered evidence.

use std::sync::Arc;

use delver_core::evidence::EvidenceRecord;
use delver_core::plan::RetrievalPlan;
use tracing::{info, warn};

use crate::gateway::LlmGateway;

/// Characters of extracted page text shown per source.
pub const FULL_CONTENT_PREVIEW_CHARS: usize = 1000;

/// Prefix of every answer produced when the model could not be reached.
pub const ERROR_ANSWER_PREFIX: &str = "I encountered an error while processing your query: ";

pub struct AnswerSynthesizer {
    gateway: Arc<LlmGateway>,
}

impl AnswerSynthesizer {
    pub fn new(gateway: Arc<LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Draft an answer. Gateway failures become an explanatory answer.
    pub async fn synthesize(
        &self,
        query: &str,
        evidence: &[EvidenceRecord],
        plan: &RetrievalPlan,
    ) -> String {
        info!(sources = evidence.len(), "Synthesizing answer");
        let prompt = synthesis_prompt(query, evidence, plan.answer_type());
        match self.gateway.complete(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "Answer synthesis failed");
                error_answer(&e)
            }
        }
    }
}

pub fn error_answer(reason: &impl std::fmt::Display) -> String {
    format!("{ERROR_ANSWER_PREFIX}{reason}")
}

/// Render evidence as numbered source blocks separated by `---`.
pub fn render_evidence(evidence: &[EvidenceRecord]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut block = format!(
                "Source {} ({}):\nTitle: {}\nContent: {}\n",
                i + 1,
                record.source.label(),
                record.title,
                record.snippet
            );
            if let Some(full) = record.full_content.as_deref().filter(|c| !c.is_empty()) {
                let preview: String = full.chars().take(FULL_CONTENT_PREVIEW_CHARS).collect();
                block.push_str(&format!("Full Content: {preview}...\n"));
            }
            block.push_str(&format!("URL: {}\n", record.url.as_deref().unwrap_or("N/A")));
            block
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

pub fn synthesis_prompt(query: &str, evidence: &[EvidenceRecord], answer_type: &str) -> String {
    let context = render_evidence(evidence);
    format!(
        r#"You are a helpful AI assistant. Using the provided information sources, answer the user's query comprehensively and accurately.

User Query: "{query}"

Expected answer format: {answer_type}

Available Information:
{context}

Instructions:
1. Provide a comprehensive and accurate answer based on the information gathered
2. Cite your sources by mentioning them (e.g., "According to Wikipedia..." or "Based on recent web sources...")
3. If information is conflicting or uncertain, acknowledge this
4. If the gathered information is insufficient, say so honestly
5. Provide URLs when relevant for further reading
6. Structure your answer clearly with proper formatting

Answer:"#
    )
}
