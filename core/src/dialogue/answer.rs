//! Direct answers for questions about fields and concepts.
//!
//! These bypass the slot pipeline. Common UMI questions get fixed answers; anything
//! else is answered by the generator from the current question alone.

use crate::llm::CompletionPort;
use crate::{AssistError, Result};
use std::sync::Arc;
use tracing::debug;

use super::lexicon::{contains_any, contains_term};

/// Reply for off-topic utterances
pub const REDIRECT_MESSAGE: &str = "I'm an assistant for the UMI project and can only help with \
UMI APIs: building requests, choosing fields, and explaining UMI concepts. What would you like \
to build or know about UMI?";

const UMI_COMPLIANT_ANSWER: &str = "A UMI compliant request follows the **Unified Market \
Interface** (UMI) standard. UMI defines common data-exchange formats and protocols so that \
different market participants and systems interoperate. Marking a request UMI compliant sets \
`isUMICompliant` in the request context and means the payload follows those specifications.";

const UMI_ANSWER: &str = "UMI stands for **Unified Market Interface**, the interoperability \
standard used across this project. It fixes how market participants exchange data and which \
protocols they use. A request that follows it is called UMI compliant.";

const ASYNC_ANSWER: &str = "In UMI, **isAsync** is a boolean in the request context that picks \
the processing flow.

**Async (isAsync = true):**
1. The FSP commits the transaction on the DLT
2. Chaincode emits an event to the FSP over gRPC
3. The FSP publishes that event to Kafka
4. The backend consumes the event from Kafka

**Sync (isAsync = false or omitted):**
The API waits for the operation to finish and returns the result in its response.

Async requests therefore also need an event payload describing what the backend will receive.";

const UMI_QUESTION_CUES: &[&str] = &[
    "explain",
    "what is",
    "what's",
    "what does",
    "meaning",
    "stand for",
    "full form",
    "fullform",
];
const ASYNC_QUESTION_CUES: &[&str] = &[
    "explain",
    "what is",
    "what's",
    "what does",
    "field",
    "sync vs async",
    "sync versus async",
    "difference",
];

pub struct FieldQuestionAnswerer {
    port: Arc<dyn CompletionPort>,
    temperature: f32,
}

impl FieldQuestionAnswerer {
    pub fn new(port: Arc<dyn CompletionPort>, temperature: f32) -> Self {
        Self { port, temperature }
    }

    /// Answer a question about a field or concept; generator failure is surfaced
    pub async fn answer(&self, utterance: &str) -> Result<String> {
        if let Some(canned) = canned_answer(utterance) {
            debug!(target = "answer", "canned answer");
            return Ok(canned.to_string());
        }

        let prompt = answer_prompt(utterance);
        let text = self
            .port
            .complete(&prompt, self.temperature)
            .await
            .map_err(|e| AssistError::Completion(format!("answer field question: {e}")))?;
        Ok(text.trim().to_string())
    }
}

pub fn canned_answer(utterance: &str) -> Option<&'static str> {
    let lower = utterance.to_lowercase();
    if lower.contains("umi compliant") || lower.contains("umi-compliant") {
        return Some(UMI_COMPLIANT_ANSWER);
    }
    if contains_term(&lower, "umi") && contains_any(&lower, UMI_QUESTION_CUES) {
        return Some(UMI_ANSWER);
    }
    if (contains_term(&lower, "async") || contains_term(&lower, "isasync"))
        && contains_any(&lower, ASYNC_QUESTION_CUES)
    {
        return Some(ASYNC_ANSWER);
    }
    None
}

fn answer_prompt(utterance: &str) -> String {
    format!(
        r#"You are the assistant for the UMI (Unified Market Interface) project and answer only questions about this project.

Question: {utterance:?}

Rules:
- Answer this question only; do not refer to earlier questions.
- UMI means Unified Market Interface, the compliance standard of this project.
- For async/isAsync: the async flow is FSP commits on DLT, chaincode sends an event to the FSP via gRPC, the FSP produces it to Kafka, the backend consumes it. The sync flow waits for the operation to complete.
- Explain what the field is or does in the UMI context. Do not suggest APIs or generate payloads.
- If the question is unrelated to UMI, reply: "{REDIRECT_MESSAGE}"
- If you do not know, say so."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl CompletionPort for Echo {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Ok("  The id field identifies the asset.  ".into())
        }
    }

    struct Down;

    #[async_trait]
    impl CompletionPort for Down {
        async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Err(AssistError::Completion("timeout".into()))
        }
    }

    #[test]
    fn canned_answers_match_common_questions() {
        assert_eq!(canned_answer("What does UMI compliant mean?"), Some(UMI_COMPLIANT_ANSWER));
        assert_eq!(canned_answer("what is umi"), Some(UMI_ANSWER));
        assert_eq!(canned_answer("explain the isAsync field"), Some(ASYNC_ANSWER));
        assert_eq!(canned_answer("explain the id field"), None);
    }

    #[tokio::test]
    async fn generator_answer_is_trimmed() {
        let a = FieldQuestionAnswerer::new(Arc::new(Echo), 0.3);
        let text = a.answer("explain the id field").await.unwrap();
        assert_eq!(text, "The id field identifies the asset.");
    }

    #[tokio::test]
    async fn generator_failure_surfaces() {
        let a = FieldQuestionAnswerer::new(Arc::new(Down), 0.3);
        let err = a.answer("explain the value field").await.unwrap_err();
        assert!(matches!(err, AssistError::Completion(_)));
    }
}
