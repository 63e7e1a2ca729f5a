//! Tool-calling agent: the model decides which retrieval tools to use.
//!
//! Each step sends the transcript plus the registry's tool definitions and
//! interprets the reply as an [`AgentAction`]. Requested tools run against
//! the registry and their output is appended as tool messages, until the
//! model answers in plain text or the step bound is reached.

use std::sync::Arc;

use async_trait::async_trait;
use delver_config::{AgentMode, AppConfig};
use delver_core::conversation::{ConversationHistory, ConversationTurn};
use delver_core::message::Message;
use delver_core::tool::ToolCall;
use delver_tools::ToolRegistry;
use tracing::{debug, info, warn};

use crate::assistant::{Assistant, ProgressSender, emit};
use crate::gateway::LlmGateway;
use crate::progress::ProgressEvent;
use crate::synthesizer::error_answer;

/// Returned when the step bound is hit before a final answer.
pub const MAX_STEPS_ANSWER: &str = "I reached the maximum number of reasoning steps before finishing. Please try a more specific question.";

/// Returned when the model ends without text or tool calls.
pub const EMPTY_ANSWER: &str = "I was unable to process your query.";

/// What the model asked for on one step.
#[derive(Debug, Clone)]
pub enum AgentAction {
    Continue(Vec<ToolCall>),
    Final(String),
}

impl AgentAction {
    pub fn from_message(message: &Message) -> Self {
        if message.tool_calls.is_empty() {
            return Self::Final(message.content.clone());
        }

        Self::Continue(
            message
                .tool_calls
                .iter()
                .map(|tc| ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
                })
                .collect(),
        )
    }
}

pub struct ToolCallingAgent {
    gateway: Arc<LlmGateway>,
    registry: Arc<ToolRegistry>,
    max_iterations: u32,
    history_window: usize,
    verbose: bool,
    history: ConversationHistory,
    progress: Option<ProgressSender>,
}

impl ToolCallingAgent {
    pub fn new(gateway: Arc<LlmGateway>, registry: Arc<ToolRegistry>, config: &AppConfig) -> Self {
        Self {
            gateway,
            registry,
            max_iterations: config.agent_config.max_iterations.max(1),
            history_window: config.agent_config.history_window,
            verbose: config.agent_config.verbose,
            history: ConversationHistory::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    fn transcript(&self, query: &str, tool_names: &[String]) -> Vec<Message> {
        let mut messages = vec![Message::system(system_prompt(tool_names))];
        for turn in self.history.recent(self.history_window) {
            messages.push(Message::user(&turn.query));
            messages.push(Message::assistant(&turn.answer));
        }
        messages.push(Message::user(query));
        messages
    }

    /// Run one tool call, turning every failure into an observation.
    async fn observe(&self, call: &ToolCall) -> String {
        if self.verbose {
            info!(tool = %call.name, arguments = %call.arguments, "Invoking tool");
        }
        emit(
            &self.progress,
            ProgressEvent::ToolCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        )
        .await;

        let (output, success) = match self.registry.execute(call).await {
            Ok(result) => (result.output, result.success),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                (format!("Error: {e}"), false)
            }
        };

        emit(
            &self.progress,
            ProgressEvent::ToolResult {
                name: call.name.clone(),
                success,
            },
        )
        .await;
        output
    }
}

#[async_trait]
impl Assistant for ToolCallingAgent {
    fn mode(&self) -> AgentMode {
        AgentMode::ToolCalling
    }

    async fn answer(&mut self, query: &str) -> String {
        let definitions = self.registry.definitions();
        let tool_names: Vec<String> = definitions.iter().map(|d| d.name.clone()).collect();
        if tool_names.is_empty() {
            warn!("No callable tools enabled, answering from model knowledge only");
        }

        let mut messages = self.transcript(query, &tool_names);
        let mut steps = 0u32;
        let mut tool_steps = 0usize;

        info!(max_steps = self.max_iterations, tools = ?tool_names, "Tool-calling agent starting");

        let answer = loop {
            if steps >= self.max_iterations {
                warn!(steps, "Maximum reasoning steps reached");
                break MAX_STEPS_ANSWER.to_string();
            }
            steps += 1;
            emit(
                &self.progress,
                ProgressEvent::IterationStarted {
                    iteration: steps,
                    max_iterations: self.max_iterations,
                },
            )
            .await;

            let reply = match self.gateway.chat(messages.clone(), definitions.clone()).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(error = %e, "Tool-calling agent failed");
                    break error_answer(&e);
                }
            };

            match AgentAction::from_message(&reply) {
                AgentAction::Final(text) if text.trim().is_empty() => break EMPTY_ANSWER.to_string(),
                AgentAction::Final(text) => break text,
                AgentAction::Continue(calls) => {
                    debug!(step = steps, calls = calls.len(), "Model requested tools");
                    messages.push(reply);
                    for call in &calls {
                        tool_steps += 1;
                        let observation = self.observe(call).await;
                        messages.push(Message::tool_result(&call.id, observation));
                    }
                }
            }
        };

        emit(
            &self.progress,
            ProgressEvent::Done {
                iterations: steps,
                tool_steps,
            },
        )
        .await;
        info!(steps, tool_steps, "Tool-calling agent finished");

        self.history.push(
            ConversationTurn::new(query, answer.clone(), steps).with_tool_steps(tool_steps),
        );
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
        self.history_window = config.agent_config.history_window;
        self.verbose = config.agent_config.verbose;
    }
}

pub fn system_prompt(tool_names: &[String]) -> String {
    let tools = if tool_names.is_empty() {
        "none".to_string()
    } else {
        tool_names.join(", ")
    };
    format!(
        "You are a helpful AI assistant with access to various tools for gathering information.

When answering questions:
1. Think step by step about what information you need
2. Use the available tools to gather relevant information
3. If you need current/recent information, use the web search tool
4. If you need factual/encyclopedic information, use the Wikipedia search tool
5. If you need detailed content from a specific web page, use the content extraction tool
6. Provide comprehensive answers based on the information gathered
7. Always cite your sources when using tool results
8. If you can't find relevant information with the tools, say so honestly

Available tools: {tools}"
    )
}
