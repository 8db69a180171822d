//! Intent and relevance classification.
//!
//! Evaluation order, first match wins:
//! 1. off-topic lexicon without a domain term -> irrelevant
//! 2. explanation phrasing -> field question
//! 3. generator verdict
//! 4. creation-verb / short-answer fallback

use crate::context::ConversationWindow;
use crate::llm::CompletionPort;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::json::parse_object;
use super::lexicon::{self, contains_any};

/// Where the utterance goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Irrelevant,
    FieldQuestion,
    Creation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_creation: bool,
    pub is_relevant: bool,
}

impl Classification {
    pub const IRRELEVANT: Classification = Classification {
        is_creation: false,
        is_relevant: false,
    };

    pub fn intent(self) -> Intent {
        match (self.is_relevant, self.is_creation) {
            (false, _) => Intent::Irrelevant,
            (true, false) => Intent::FieldQuestion,
            (true, true) => Intent::Creation,
        }
    }
}

impl From<(bool, bool)> for Classification {
    fn from((is_creation, is_relevant): (bool, bool)) -> Self {
        Self {
            is_creation,
            is_relevant,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Verdict {
    is_creation_request: Option<bool>,
    is_relevant: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}

pub struct IntentClassifier {
    port: Arc<dyn CompletionPort>,
    temperature: f32,
}

impl IntentClassifier {
    pub fn new(port: Arc<dyn CompletionPort>, temperature: f32) -> Self {
        Self { port, temperature }
    }

    pub async fn classify(&self, utterance: &str, window: &ConversationWindow) -> Classification {
        let lower = utterance.to_lowercase();

        if is_off_topic(&lower) {
            debug!(target = "classifier", "off-topic lexicon matched");
            return Classification::IRRELEVANT;
        }
        if is_explanation(&lower) {
            debug!(target = "classifier", "explanation phrasing; field question");
            return (false, true).into();
        }

        let prompt = classification_prompt(utterance, window);
        let verdict = match self.port.complete(&prompt, self.temperature).await {
            Ok(raw) => parse_object::<Verdict>(&raw),
            Err(e) => Err(e),
        };

        match verdict {
            Ok(Verdict {
                is_creation_request: Some(is_creation),
                is_relevant,
                reason,
            }) if is_relevant != Some(false) => {
                debug!(target = "classifier", is_creation, reason = reason.as_deref().unwrap_or(""), "generator verdict");
                (is_creation, true).into()
            }
            Ok(Verdict {
                is_relevant: Some(false),
                reason,
                ..
            }) => {
                debug!(target = "classifier", reason = reason.as_deref().unwrap_or(""), "generator marked irrelevant");
                (fallback_is_creation(&lower), false).into()
            }
            Ok(_) => (fallback_is_creation(&lower), true).into(),
            Err(e) => {
                warn!(target = "classifier", error = %e, "classification failed; using keyword fallback");
                (fallback_is_creation(&lower), true).into()
            }
        }
    }
}

/// Off-topic term present and no domain term to rescue it
pub fn is_off_topic(lower: &str) -> bool {
    contains_any(lower, lexicon::OFF_TOPIC) && !contains_any(lower, lexicon::DOMAIN)
}

pub fn is_explanation(lower: &str) -> bool {
    contains_any(lower, lexicon::EXPLANATION)
}

/// Creation verbs mark a request; short utterances answer an earlier follow-up
pub fn fallback_is_creation(lower: &str) -> bool {
    contains_any(lower, lexicon::CREATION_VERBS) || lexicon::token_count(lower) <= 3
}

fn classification_prompt(utterance: &str, window: &ConversationWindow) -> String {
    let recent = if window.is_empty() {
        "(none)".to_string()
    } else {
        window.to_buffer_string()
    };
    format!(
        r#"You route messages for an assistant that helps developers build UMI API requests.

Decide for the user message below:
1. Is it a request to CREATE or operate on something ("create a gold bond", "burn asset", "build an insurance usecase")?
2. Is it a question ABOUT a field or concept ("what is toWalletAddress?", "explain the id field")?
3. Is it an answer to an earlier follow-up question ("yes", "no", "async", "private", a list of field names, "create", "burn", "trade")?

Answers to follow-up questions continue a creation request, so they count as creation requests.
Messages unrelated to APIs, assets or payloads are not relevant.

User message: {utterance:?}
Recent conversation:
{recent}

Return ONLY a JSON object:
{{"is_creation_request": true or false, "is_relevant": true or false, "reason": "short explanation"}}"#
    )
}
