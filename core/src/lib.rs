// UMI Assist Core Library
// Multi-turn slot-filling assistant that composes API requests for the UMI catalog

pub mod context;
pub mod dialogue;
pub mod llm;
pub mod recommend;
pub mod service;

// Export core types
pub use context::{ConversationTurn, ConversationWindow, HistoryStore, InMemoryHistory, Role};
pub use dialogue::{CompletenessResult, Operation, PipelineConfig, QueryInfo, TriState};
pub use llm::{CompletionPort, LlmClient, LlmClientConfig};
pub use recommend::{ApiCatalogEntry, ApiField, Catalog, Recommendation, RecommendationEngine};
pub use service::{ChatService, TurnOutcome};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("api_index {index} out of range for catalog of {len} entries")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Payload synthesis error: {0}")]
    PayloadSynthesis(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, AssistError>;
