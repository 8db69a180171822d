//! Bounded view over recent conversation turns.
//!
//! A window is recomputed for every request from the history store and never
//! persisted. It renders into the `Human:` / `AI:` buffer format the prompts use.

use super::types::{ConversationTurn, Role};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationWindow {
    /// Turns in chronological order
    turns: Vec<ConversationTurn>,
}

impl ConversationWindow {
    pub fn new(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Window holding only the last `n` turns
    pub fn tail(&self, n: usize) -> Self {
        let start = self.turns.len().saturating_sub(n);
        Self {
            turns: self.turns[start..].to_vec(),
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn user_turns(&self) -> impl DoubleEndedIterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.role == Role::User)
    }

    /// Pairs of (assistant question, user answer) where the answer directly follows the question
    pub fn question_answer_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.turns.windows(2).filter_map(|w| {
            (w[0].role == Role::Assistant && w[1].role == Role::User)
                .then(|| (w[0].content.as_str(), w[1].content.as_str()))
        })
    }

    /// Most recent assistant turn, if any
    pub fn last_assistant(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|t| t.role == Role::Assistant)
    }

    /// Render as prompt buffer
    pub fn to_buffer_string(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role.buffer_prefix(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl From<Vec<ConversationTurn>> for ConversationWindow {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self::new(turns)
    }
}
