//! Tool traits: the abstraction over retrieval capabilities.
//!
//! A tool can expose two shapes:
//!
//! 1. A direct capability, [`SearchTool`] or [`ContentExtractor`], called
//!    by the fixed research pipeline.
//! 2. The machine-invocable [`Tool`] interface (name, description, JSON
//!    schema, `execute`) consumed by a model-driven tool-calling agent.
//!
//! Built-in tools implement both; the registry records which shapes each
//! loaded instance supports.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::evidence::SearchHit;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    pub name: String,

    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    pub success: bool,

    /// The output content
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A search capability: web search engines, encyclopedias.
///
/// Implementations never fail towards the caller: an empty vector is the
/// failure signal, and the reason is logged by the tool.
#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit>;
}

/// Pulls readable text out of a web page.
///
/// Failures come back as a human-readable explanation in the returned
/// string rather than as an error.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, url: &str, max_length: usize) -> String;
}

/// The machine-invocable tool interface.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "web_search").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
