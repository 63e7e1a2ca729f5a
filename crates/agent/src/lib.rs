//! The research loop for Delver.
//!
//! Two strategies answer a query:
//!
//! 1. [`IterationController`] runs a fixed pipeline per pass:
//!    **analyze → gather → synthesize → evaluate**, refining the query and
//!    repeating until the evaluator is satisfied or `max_iterations` passes
//!    have run.
//! 2. [`ToolCallingAgent`] hands the registry's tools to the model and lets
//!    it decide what to call, bounded by the same step limit.
//!
//! Both implement [`Assistant`], so frontends can drive either one.

pub mod analyzer;
pub mod assistant;
pub mod controller;
pub mod evaluator;
pub mod gatherer;
pub mod gateway;
pub mod progress;
pub mod synthesizer;
pub mod tool_agent;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use delver_config::{AgentMode, AppConfig};
use delver_tools::ToolRegistry;

pub use analyzer::QueryAnalyzer;
pub use assistant::{Assistant, ProgressSender};
pub use controller::{IterationController, REFINEMENT_SUFFIX, Stage};
pub use evaluator::{NEEDS_MORE_RESEARCH, SufficiencyEvaluator};
pub use gatherer::InformationGatherer;
pub use gateway::LlmGateway;
pub use progress::ProgressEvent;
pub use synthesizer::AnswerSynthesizer;
pub use tool_agent::{AgentAction, MAX_STEPS_ANSWER, ToolCallingAgent};

/// Build the assistant selected by `mode`.
pub fn build_assistant(
    mode: AgentMode,
    gateway: Arc<LlmGateway>,
    registry: Arc<ToolRegistry>,
    config: &AppConfig,
    progress: Option<ProgressSender>,
) -> Box<dyn Assistant> {
    match mode {
        AgentMode::Pipeline => {
            let controller = IterationController::new(gateway, registry, config);
            Box::new(match progress {
                Some(tx) => controller.with_progress(tx),
                None => controller,
            })
        }
        AgentMode::ToolCalling => {
            let agent = ToolCallingAgent::new(gateway, registry, config);
            Box::new(match progress {
                Some(tx) => agent.with_progress(tx),
                None => agent,
            })
        }
    }
}
