//! Multi-turn slot-filling dialogue
//!
//! Per turn: classify -> detect new request -> extract slots -> gate ->
//! follow-up question or recommendation. Field questions bypass the slots and
//! off-topic utterances get a fixed redirect.

pub mod answer;
pub mod classifier;
pub mod config;
pub mod extractor;
pub mod followup;
pub mod gate;
pub mod json;
pub mod lexicon;
pub mod new_request;
pub mod slots;

pub use answer::{FieldQuestionAnswerer, REDIRECT_MESSAGE};
pub use classifier::{Classification, Intent, IntentClassifier};
pub use config::{PipelineConfig, Temperatures};
pub use extractor::SlotExtractor;
pub use followup::FollowUpComposer;
pub use gate::{evaluate, is_complete, CompletenessResult, MissingSlot};
pub use new_request::is_new_request;
pub use slots::{Operation, QueryInfo, TriState};
