//! Progress events emitted while a query is being answered.
//!
//! The CLI subscribes to these to print per-stage status lines; they are
//! serializable so other frontends can forward them as JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A research pass is starting.
    IterationStarted { iteration: u32, max_iterations: u32 },

    Analyzing,

    /// Retrieval is about to run with this plan.
    Gathering {
        terms: Vec<String>,
        web: bool,
        encyclopedia: bool,
    },

    /// Evidence gathered; 0 means the answer relies on model knowledge.
    Gathered { sources: usize },

    Synthesizing,

    Evaluating,

    /// Another pass will run with the refined query.
    Refining { query: String },

    /// The tool-calling agent is invoking a tool.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },

    ToolResult {
        name: String,
        success: bool,
    },

    /// The answer is final.
    Done { iterations: u32, tool_steps: usize },
}

impl ProgressEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::IterationStarted { .. } => "iteration_started",
            Self::Analyzing => "analyzing",
            Self::Gathering { .. } => "gathering",
            Self::Gathered { .. } => "gathered",
            Self::Synthesizing => "synthesizing",
            Self::Evaluating => "evaluating",
            Self::Refining { .. } => "refining",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
        }
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IterationStarted {
                iteration,
                max_iterations,
            } => write!(f, "Iteration {iteration}/{max_iterations}"),
            Self::Analyzing => f.write_str("Analyzing your query..."),
            Self::Gathering { terms, .. } => write!(
                f,
                "Gathering information for: {}",
                terms.first().map(String::as_str).unwrap_or("")
            ),
            Self::Gathered { sources: 0 } => {
                f.write_str("No additional information found. Using existing knowledge...")
            }
            Self::Gathered { sources } => write!(f, "Gathered {sources} information sources"),
            Self::Synthesizing => f.write_str("Synthesizing answer..."),
            Self::Evaluating => f.write_str("Evaluating if more research is needed..."),
            Self::Refining { .. } => f.write_str("Additional research may improve the answer..."),
            Self::ToolCall { name, .. } => write!(f, "Calling tool: {name}"),
            Self::ToolResult { name, success } => {
                write!(f, "Tool {name} {}", if *success { "finished" } else { "failed" })
            }
            Self::Done { iterations, .. } => write!(f, "Done after {iterations} iteration(s)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&ProgressEvent::IterationStarted {
            iteration: 1,
            max_iterations: 3,
        })
        .unwrap();
        assert!(json.contains(r#""type":"iteration_started""#));
        assert!(json.contains(r#""max_iterations":3"#));
    }

    #[test]
    fn unit_variants_round_trip() {
        let event: ProgressEvent = serde_json::from_str(r#"{"type":"analyzing"}"#).unwrap();
        assert_eq!(event, ProgressEvent::Analyzing);
        assert_eq!(event.event_type(), "analyzing");
    }

    #[test]
    fn display_lines() {
        assert_eq!(
            ProgressEvent::IterationStarted {
                iteration: 2,
                max_iterations: 3
            }
            .to_string(),
            "Iteration 2/3"
        );
        assert_eq!(
            ProgressEvent::Gathered { sources: 0 }.to_string(),
            "No additional information found. Using existing knowledge..."
        );
    }
}
