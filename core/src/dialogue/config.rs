//! Configuration for the dialogue pipeline.

use serde::{Deserialize, Serialize};

/// Sampling temperatures per pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    pub classification: f32,
    pub extraction: f32,
    pub selection: f32,
    pub payload: f32,
    pub follow_up: f32,
    pub answer: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            classification: 0.0,
            extraction: 0.0,
            selection: 0.0,
            payload: 0.2,
            follow_up: 0.3,
            answer: 0.3,
        }
    }
}

/// Configuration for the per-turn dialogue pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Turns loaded from the history store per request
    pub history_turns: usize,

    /// Turns shown to the classifier
    pub classification_window: usize,

    /// Turns kept when the utterance starts a fresh request
    pub new_request_window: usize,

    /// Turns given to the extractor on continuation turns
    pub continuation_window: usize,

    pub temperatures: Temperatures,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_turns: 20,
            classification_window: 6,
            new_request_window: 2,
            continuation_window: 10,
            temperatures: Temperatures::default(),
        }
    }
}
