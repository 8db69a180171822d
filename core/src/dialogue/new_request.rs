//! Decides whether an utterance opens a fresh creation request.
//!
//! A fresh request resets the carried slots and hides prior turns from the extractor.

use crate::context::ConversationWindow;
use tracing::debug;

use super::lexicon::{self, contains_any};

/// Creation verb plus domain noun, and not a short answer.
///
/// The window is accepted so callers can pass the same view they give the classifier;
/// the decision only depends on the utterance itself.
pub fn is_new_request(utterance: &str, _window: &ConversationWindow) -> bool {
    let lower = utterance.to_lowercase();
    if lexicon::token_count(&lower) <= 3 || lexicon::is_yes_no(&lower) {
        return false;
    }
    let fresh = contains_any(&lower, lexicon::CREATION_VERBS)
        && contains_any(&lower, lexicon::NEW_REQUEST_NOUNS);
    debug!(target = "new_request", fresh, "new-request check");
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ConversationTurn;

    fn history() -> ConversationWindow {
        ConversationWindow::new(vec![
            ConversationTurn::user("s", "I want to create a gold bond asset"),
            ConversationTurn::assistant("s", "Is this request async? (yes/no)"),
        ])
    }

    #[test]
    fn yes_is_never_new() {
        assert!(!is_new_request("yes", &history()));
        assert!(!is_new_request("yes", &ConversationWindow::empty()));
    }

    #[test]
    fn short_operation_answer_is_continuation() {
        assert!(!is_new_request("create gold bond", &history()));
    }

    #[test]
    fn verb_and_noun_open_a_new_request() {
        assert!(is_new_request("now I want to burn an insurance asset", &history()));
        assert!(is_new_request("please create a new gold bond", &ConversationWindow::empty()));
    }

    #[test]
    fn answers_without_domain_nouns_continue() {
        assert!(!is_new_request("make it async and umi compliant please", &history()));
    }
}
