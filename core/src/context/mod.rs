//! Conversation context
//!
//! - **Types**: recorded turns and the read models served to front ends
//! - **Window**: bounded per-request view used as extraction context
//! - **Memory**: append-only history stores (in-memory and RocksDB)
//! - **PromptBundle**: what the LLM client sends upstream

pub mod memory;
pub mod types;
pub mod window;

pub use memory::{HistoryStore, InMemoryHistory, RocksDbHistory};
pub use types::{ConversationTurn, Role, SessionSummary, StoredMessage};
pub use window::ConversationWindow;

use serde::{Deserialize, Serialize};

/// Token budget to control prompt assembly size
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenBudget {
    pub max_input_tokens: usize,
    pub max_output_tokens: usize,
}

impl Default for TokenBudget {
    fn default() -> Self {
        // payload prompts embed the full request schema
        Self {
            max_input_tokens: 8192,
            max_output_tokens: 1024,
        }
    }
}

/// A bundle of prompt components for an LLM call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptBundle {
    pub system: String,
    pub instructions: String,
    pub context_docs: Vec<String>,
    pub history: Vec<String>,
}
