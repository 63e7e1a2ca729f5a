//! The iterative research loop.
//!
//! Each pass runs analyze → gather → synthesize, then asks the evaluator
//! whether another pass with a refined query is worth it. The loop is an
//! explicit [`Stage`] machine bounded by `max_iterations`.

use std::sync::Arc;

use async_trait::async_trait;
use delver_config::{AgentMode, AppConfig};
use delver_core::conversation::{ConversationHistory, ConversationTurn};
use delver_core::evidence::EvidenceRecord;
use delver_core::plan::RetrievalPlan;
use delver_tools::ToolRegistry;
use tracing::{debug, info};

use crate::analyzer::QueryAnalyzer;
use crate::assistant::{Assistant, ProgressSender, emit};
use crate::evaluator::SufficiencyEvaluator;
use crate::gatherer::InformationGatherer;
use crate::gateway::LlmGateway;
use crate::progress::ProgressEvent;
use crate::synthesizer::AnswerSynthesizer;

/// Appended to the query before each additional pass.
pub const REFINEMENT_SUFFIX: &str = " (provide more detailed and current information)";

/// Where the loop is, with the data the next step needs.
#[derive(Debug)]
pub enum Stage {
    Analyzing,
    Gathering(RetrievalPlan),
    Synthesizing(RetrievalPlan, Vec<EvidenceRecord>),
    Evaluating,
    Refining,
    Done,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Analyzing => "analyzing",
            Self::Gathering(_) => "gathering",
            Self::Synthesizing(..) => "synthesizing",
            Self::Evaluating => "evaluating",
            Self::Refining => "refining",
            Self::Done => "done",
        }
    }
}

pub struct IterationController {
    analyzer: QueryAnalyzer,
    gatherer: InformationGatherer,
    synthesizer: AnswerSynthesizer,
    evaluator: SufficiencyEvaluator,
    max_iterations: u32,
    verbose: bool,
    history: ConversationHistory,
    progress: Option<ProgressSender>,
}

impl IterationController {
    pub fn new(gateway: Arc<LlmGateway>, registry: Arc<ToolRegistry>, config: &AppConfig) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(gateway.clone()),
            gatherer: InformationGatherer::new(registry, config.search_strategy.clone()),
            synthesizer: AnswerSynthesizer::new(gateway.clone()),
            evaluator: SufficiencyEvaluator::new(gateway),
            max_iterations: config.agent_config.max_iterations.max(1),
            verbose: config.agent_config.verbose,
            history: ConversationHistory::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    fn log_stage(&self, stage: &Stage, iteration: u32) {
        if self.verbose {
            info!(stage = stage.name(), iteration, "Research stage");
        } else {
            debug!(stage = stage.name(), iteration, "Research stage");
        }
    }
}

#[async_trait]
impl Assistant for IterationController {
    fn mode(&self) -> AgentMode {
        AgentMode::Pipeline
    }

    async fn answer(&mut self, query: &str) -> String {
        let max_iterations = self.max_iterations;
        let mut query = query.to_string();
        let mut iteration = 1u32;
        let mut answer = String::new();
        let mut stage = Stage::Analyzing;

        info!(query = %query, max_iterations, "Processing query");

        loop {
            self.log_stage(&stage, iteration);
            stage = match stage {
                Stage::Analyzing => {
                    emit(
                        &self.progress,
                        ProgressEvent::IterationStarted {
                            iteration,
                            max_iterations,
                        },
                    )
                    .await;
                    emit(&self.progress, ProgressEvent::Analyzing).await;
                    Stage::Gathering(self.analyzer.analyze(&query).await)
                }
                Stage::Gathering(plan) => {
                    emit(
                        &self.progress,
                        ProgressEvent::Gathering {
                            terms: plan.search_terms().to_vec(),
                            web: plan.needs_web(),
                            encyclopedia: plan.needs_encyclopedia(),
                        },
                    )
                    .await;
                    let evidence = self.gatherer.gather(&plan).await;
                    emit(
                        &self.progress,
                        ProgressEvent::Gathered {
                            sources: evidence.len(),
                        },
                    )
                    .await;
                    Stage::Synthesizing(plan, evidence)
                }
                Stage::Synthesizing(plan, evidence) => {
                    emit(&self.progress, ProgressEvent::Synthesizing).await;
                    answer = self.synthesizer.synthesize(&query, &evidence, &plan).await;
                    if iteration < max_iterations {
                        Stage::Evaluating
                    } else {
                        Stage::Done
                    }
                }
                Stage::Evaluating => {
                    emit(&self.progress, ProgressEvent::Evaluating).await;
                    if self.evaluator.should_iterate(&query, &answer).await {
                        Stage::Refining
                    } else {
                        Stage::Done
                    }
                }
                Stage::Refining => {
                    query.push_str(REFINEMENT_SUFFIX);
                    iteration += 1;
                    emit(
                        &self.progress,
                        ProgressEvent::Refining {
                            query: query.clone(),
                        },
                    )
                    .await;
                    Stage::Analyzing
                }
                Stage::Done => break,
            };
        }

        emit(
            &self.progress,
            ProgressEvent::Done {
                iterations: iteration,
                tool_steps: 0,
            },
        )
        .await;
        info!(iterations = iteration, "Query answered");

        self.history
            .push(ConversationTurn::new(query, answer.clone(), iteration));
        answer
    }

    fn history(&self) -> &ConversationHistory {
        &self.history
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }

    fn apply_settings(&mut self, config: &AppConfig) {
        self.max_iterations = config.agent_config.max_iterations.max(1);
        self.verbose = config.agent_config.verbose;
        self.gatherer.set_strategy(config.search_strategy.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingSearch, SequentialMockProvider, hit, mock_registry};

    const PLAN: &str = "NEEDS_WEB_SEARCH: yes\nNEEDS_WIKIPEDIA: no\nSEARCH_TERMS: rust\nANSWER_TYPE: summary";

    fn controller(
        replies: &[&str],
        max_iterations: u32,
    ) -> (IterationController, Arc<SequentialMockProvider>) {
        let provider = Arc::new(SequentialMockProvider::texts(replies));
        let gateway = Arc::new(LlmGateway::new(provider.clone(), "m"));
        let mut config = AppConfig::default();
        config.agent_config.max_iterations = max_iterations;
        let registry = mock_registry(Some(RecordingSearch::returning(vec![hit(1)])), None, None);
        (IterationController::new(gateway, registry, &config), provider)
    }

    #[tokio::test]
    async fn single_pass_when_sufficient() {
        let (mut c, provider) = controller(&[PLAN, "Draft", "SUFFICIENT"], 3);
        assert_eq!(c.answer("q").await, "Draft");
        assert_eq!(provider.call_count(), 3);

        let turn = c.history().last().unwrap();
        assert_eq!(turn.iteration_count, 1);
        assert_eq!(turn.query, "q");
    }

    #[tokio::test]
    async fn refines_query_until_sufficient() {
        let (mut c, provider) = controller(
            &[PLAN, "Draft 1", "NEEDS_MORE_RESEARCH", PLAN, "Draft 2", "SUFFICIENT"],
            3,
        );
        assert_eq!(c.answer("q").await, "Draft 2");

        let turn = c.history().last().unwrap();
        assert_eq!(turn.iteration_count, 2);
        assert_eq!(turn.query, format!("q{REFINEMENT_SUFFIX}"));
        assert!(provider.prompts()[3].contains(&format!("Query: \"q{REFINEMENT_SUFFIX}\"")));
    }

    #[tokio::test]
    async fn last_pass_skips_evaluation() {
        let (mut c, provider) = controller(
            &[PLAN, "Draft 1", "NEEDS_MORE_RESEARCH", PLAN, "Draft 2"],
            2,
        );
        assert_eq!(c.answer("q").await, "Draft 2");
        assert_eq!(provider.call_count(), 5);
        assert_eq!(c.history().last().unwrap().iteration_count, 2);
    }

    #[tokio::test]
    async fn progress_events_follow_stages() {
        let (c, _) = controller(&[PLAN, "Draft", "SUFFICIENT"], 3);
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let mut c = c.with_progress(tx);
        c.answer("q").await;
        drop(c);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.event_type());
        }
        assert_eq!(
            kinds,
            vec![
                "iteration_started",
                "analyzing",
                "gathering",
                "gathered",
                "synthesizing",
                "evaluating",
                "done"
            ]
        );
    }

    #[tokio::test]
    async fn apply_settings_updates_bound() {
        let (mut c, provider) = controller(&[PLAN, "Only draft"], 3);
        let mut config = AppConfig::default();
        config.agent_config.max_iterations = 1;
        c.apply_settings(&config);

        assert_eq!(c.answer("q").await, "Only draft");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn clear_history_empties_turns() {
        let (mut c, _) = controller(&[PLAN, "Draft"], 1);
        c.answer("q").await;
        assert_eq!(c.history().len(), 1);
        c.clear_history();
        assert!(c.history().is_empty());
    }
}
