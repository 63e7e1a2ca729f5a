//! Conversation history: one immutable turn per answered query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// The query text last sent to the model (after any refinement).
    pub query: String,
    pub answer: String,
    /// Loop passes used to produce the answer; always at least 1.
    pub iteration_count: u32,
    /// Tool invocations made by a tool-calling agent (0 for the pipeline).
    #[serde(default)]
    pub tool_steps: usize,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>, iteration_count: u32) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
            iteration_count: iteration_count.max(1),
            tool_steps: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_tool_steps(mut self, steps: usize) -> Self {
        self.tool_steps = steps;
        self
    }
}

/// Append-only, in-memory history owned by a single controller.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_count_is_at_least_one() {
        assert_eq!(ConversationTurn::new("q", "a", 0).iteration_count, 1);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut history = ConversationHistory::new();
        for i in 0..7 {
            history.push(ConversationTurn::new(format!("q{i}"), "a", 1));
        }
        let recent = history.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].query, "q2");
        assert_eq!(recent[4].query, "q6");
        assert_eq!(history.recent(50).len(), 7);
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ConversationHistory::new();
        history.push(ConversationTurn::new("q", "a", 2));
        history.clear();
        assert!(history.is_empty());
        assert!(history.last().is_none());
    }
}
