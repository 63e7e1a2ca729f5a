//! # Delver Core
//!
//! Domain types, traits, and error definitions for the Delver research
//! assistant. This crate has no I/O of its own; it defines the model that
//! the tool, provider and agent crates implement against.
//!
//! ## Layout
//!
//! - [`provider`]: the LLM backend abstraction
//! - [`tool`]: retrieval capabilities (`SearchTool`, `ContentExtractor`) and
//!   the machine-invocable [`Tool`] interface used by tool-calling agents
//! - [`evidence`], [`plan`], [`conversation`]: the data that flows through
//!   the research loop

pub mod conversation;
pub mod error;
pub mod evidence;
pub mod message;
pub mod plan;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use conversation::{ConversationHistory, ConversationTurn};
pub use error::{GatewayError, RegistryLoadError, ToolError};
pub use evidence::{EvidenceRecord, EvidenceSource, SearchHit};
pub use message::{Message, MessageToolCall, Role};
pub use plan::RetrievalPlan;
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{ContentExtractor, SearchTool, Tool, ToolCall, ToolResult};
