//! Turns unmet gate conditions into a single follow-up message.

use crate::llm::CompletionPort;
use std::sync::Arc;
use tracing::{debug, warn};

use super::gate::{CompletenessResult, MissingSlot};
use super::lexicon::suggested_fields;
use super::slots::QueryInfo;

const MAX_PARAPHRASE_CHARS: usize = 1200;

/// Keywords that must not appear in a paraphrase unless their slot is missing
const EXCLUSIVE: &[MissingSlot] = &[
    MissingSlot::Operation,
    MissingSlot::IsAsync,
    MissingSlot::IsUmiCompliant,
    MissingSlot::IsPrivate,
];

pub struct FollowUpComposer {
    port: Arc<dyn CompletionPort>,
    temperature: f32,
}

impl FollowUpComposer {
    pub fn new(port: Arc<dyn CompletionPort>, temperature: f32) -> Self {
        Self { port, temperature }
    }

    /// Compose one message asking for every missing slot.
    ///
    /// A missing operation for a known use case is asked on its own, ahead of anything else.
    pub async fn compose(&self, q: &QueryInfo, result: &CompletenessResult) -> String {
        if result.missing.contains(&MissingSlot::Operation) {
            return self.operation_question(q).await;
        }

        let items: Vec<String> = result.missing.iter().map(|m| item_text(*m, q)).collect();
        let template = numbered_template(&items);

        let prompt = format!(
            "Rewrite the following request for information as one short, friendly message to a developer.\n\
             Keep every item, ask for all of them at once, and do not add other questions.\n\n{template}\n\n\
             Return only the message."
        );
        match self.port.complete(&prompt, self.temperature).await {
            Ok(text) if paraphrase_is_faithful(&text, &result.missing) => {
                debug!(target = "followup", items = items.len(), "using paraphrased follow-up");
                text.trim().to_string()
            }
            Ok(_) => {
                debug!(target = "followup", "paraphrase dropped or added items; using template");
                template
            }
            Err(e) => {
                warn!(target = "followup", error = %e, "follow-up paraphrase failed; using template");
                template
            }
        }
    }

    async fn operation_question(&self, q: &QueryInfo) -> String {
        let use_case = q.use_case.as_deref().unwrap_or("this");
        let template = operation_template(use_case);
        let prompt = format!(
            "The user wants to build a {use_case} usecase on UMI. Ask them, in one short message, \
             which operation they want: create (issue, served by the req issue API), burn (manage, \
             served by the req manage API) or trade (settle, served by the req settle API). \
             Ask nothing else. Return only the message."
        );
        match self.port.complete(&prompt, self.temperature).await {
            Ok(text) if mentions_all(&text, &["create", "burn", "trade"]) && text.len() <= MAX_PARAPHRASE_CHARS => {
                text.trim().to_string()
            }
            Ok(_) => template,
            Err(e) => {
                warn!(target = "followup", error = %e, "operation question failed; using template");
                template
            }
        }
    }
}

pub fn item_text(slot: MissingSlot, q: &QueryInfo) -> String {
    match slot {
        MissingSlot::Operation => "Which operation do you want to perform: create, burn, or trade?".into(),
        MissingSlot::IsAsync => "Is this request async? (yes/no)".into(),
        MissingSlot::IsUmiCompliant => "Is this UMI compliant? (yes/no)".into(),
        MissingSlot::IsPrivate => "Is this private or public?".into(),
        MissingSlot::FieldNames => {
            let suggested = q
                .use_case
                .as_deref()
                .map(|uc| suggested_fields(uc, q.operation))
                .unwrap_or_default();
            if suggested.is_empty() {
                "Which fields should the request payload include? (e.g., id, value, toWalletAddress)".into()
            } else {
                format!(
                    "Which fields should the request payload include? Suggested fields for {}: {}",
                    q.use_case.as_deref().unwrap_or_default(),
                    suggested.join(", ")
                )
            }
        }
        MissingSlot::EventFields => {
            "Which fields should the event payload include? (e.g., id, type, eventType, timestamp)".into()
        }
    }
}

pub fn numbered_template(items: &[String]) -> String {
    let mut out = String::from("To proceed with your request, I need the following information:\n");
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, item));
    }
    out.push_str("Please provide all of these details at once.");
    out
}

pub fn operation_template(use_case: &str) -> String {
    format!(
        "For {use_case} usecase, which operation do you want to perform?\n\n\
         - CREATE/ISSUE → use req issue API\n\
         - BURN/MANAGE → use req manage API\n\
         - TRADE/SETTLE → use req settle API\n\n\
         Please specify: create, burn, or trade"
    )
}

fn mentions_all(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().all(|w| lower.contains(w))
}

/// The paraphrase asks for every missing slot and nothing the user already answered
fn paraphrase_is_faithful(text: &str, missing: &[MissingSlot]) -> bool {
    let lower = text.to_lowercase();
    if lower.trim().is_empty() || lower.len() > MAX_PARAPHRASE_CHARS {
        return false;
    }
    let covers = missing.iter().all(|m| lower.contains(m.keyword()));
    let strays = EXCLUSIVE
        .iter()
        .filter(|slot| !missing.contains(slot))
        .any(|slot| lower.contains(slot.keyword()));
    covers && !strays
}
