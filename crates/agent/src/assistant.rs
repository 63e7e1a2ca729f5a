//! The interface shared by both answer strategies.

use async_trait::async_trait;
use delver_config::{AgentMode, AppConfig};
use delver_core::conversation::ConversationHistory;
use tokio::sync::mpsc;

use crate::progress::ProgressEvent;

/// Channel on which controllers publish [`ProgressEvent`]s.
pub type ProgressSender = mpsc::Sender<ProgressEvent>;

/// A conversational research assistant.
///
/// Implementations own their history; one top-level query appends exactly
/// one turn.
#[async_trait]
pub trait Assistant: Send {
    fn mode(&self) -> AgentMode;

    /// Answer `query`. Failures are reported inside the returned text.
    async fn answer(&mut self, query: &str) -> String;

    fn history(&self) -> &ConversationHistory;

    fn clear_history(&mut self);

    /// Pick up reloaded agent and search-strategy settings.
    fn apply_settings(&mut self, config: &AppConfig);
}

/// Publish `event` if anyone is listening. A closed channel is ignored.
pub(crate) async fn emit(progress: &Option<ProgressSender>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}
