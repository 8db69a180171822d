//! Slot extraction for creation requests.
//!
//! One generator call proposes the slots; a keyword fallback fills whatever the
//! generator left unresolved. The per-turn result is then merged onto the slots
//! carried from earlier turns of the same request.

use crate::context::{ConversationWindow, Role};
use crate::llm::CompletionPort;
use crate::recommend::RECOMMENDATION_HEADER;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::classifier::is_explanation;
use super::json::extract_object;
use super::lexicon::{self, contains_any, contains_term, exact_term_positions, term_positions};
use super::new_request::is_new_request;
use super::slots::{Operation, QueryInfo, TriState};

static NEG_BEFORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\bnot|\bno|\bnon|n't|\bnever)[\s-]*(?:an?\s+|be\s+|really\s+)?$")
        .expect("static regex")
});
static ANSWER_AFTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s*compliant)?\s*(?:[:=?-]|\bis\b)?\s*(yes|yeah|yep|true|y|no|nope|false|not)\b")
        .expect("static regex")
});
static EXPLAIN_BEFORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:explain|what\s+is|what's|what\s+does|meaning\s+of|describe|tell\s+me\s+about)\s+(?:the\s+|a\s+|an\s+)?$",
    )
    .expect("static regex")
});

const ASYNC_TERMS: &[&str] = &["async", "asynchronous"];
const SYNC_TERMS: &[&str] = &["sync", "synchronous"];
const UMI_TERMS: &[&str] = &["umi"];
const PRIVACY_TERMS: &[&str] = &["private", "public"];

pub struct SlotExtractor {
    port: Arc<dyn CompletionPort>,
    temperature: f32,
}

impl SlotExtractor {
    pub fn new(port: Arc<dyn CompletionPort>, temperature: f32) -> Self {
        Self { port, temperature }
    }

    /// Extract this turn's slots and merge them onto `prior`.
    ///
    /// A new request ignores both `context` and `prior`.
    pub async fn extract(
        &self,
        utterance: &str,
        context: &ConversationWindow,
        prior: &QueryInfo,
        is_new_request: bool,
    ) -> QueryInfo {
        let empty = ConversationWindow::empty();
        let (context, base) = if is_new_request {
            (&empty, QueryInfo::default())
        } else {
            (context, prior.clone())
        };

        let prompt = extraction_prompt(utterance, context);
        let generated = match self.port.complete(&prompt, self.temperature).await {
            Ok(raw) => match extract_object(&raw) {
                Some(v) => Some(from_generator(&v)),
                None => {
                    warn!(target = "extractor", "extraction output had no JSON object; using fallback");
                    None
                }
            },
            Err(e) => {
                warn!(target = "extractor", error = %e, "extraction call failed; using fallback");
                None
            }
        };

        let fallback = fallback_extract(utterance, context, &base);
        let turn = combine(generated, fallback, &base);
        debug!(target = "extractor", turn = ?turn, "turn slots");

        let mut merged = base;
        merged.merge_turn(turn);
        merged
    }
}

/// Generator result wins; the fallback fills only what it left unresolved.
fn combine(generated: Option<QueryInfo>, mut fallback: QueryInfo, base: &QueryInfo) -> QueryInfo {
    let resolves_use_case = generated
        .as_ref()
        .and_then(|g| g.use_case.as_ref())
        .or(fallback.use_case.as_ref())
        .is_some();
    if base.use_case.is_none() && resolves_use_case {
        // the opening verb of "create a gold bond" names the request, not the operation
        fallback.operation = Operation::Unset;
    }

    let Some(mut turn) = generated else {
        return fallback;
    };
    turn.fill_gaps(&fallback);
    if turn.field_names.is_empty() {
        turn.field_names = fallback.field_names;
    }
    if turn.event_fields.is_empty() {
        turn.event_fields = fallback.event_fields;
    }
    turn.enforce_disjoint();
    turn
}

/// Map the generator's JSON onto a slot set, tolerating loose typing
fn from_generator(v: &Value) -> QueryInfo {
    let mut q = QueryInfo {
        is_async: loose_bool(v.get("is_async")),
        is_umi_compliant: loose_bool(v.get("is_umi_compliant")),
        is_private: loose_bool(v.get("is_private")),
        field_names: string_list(v.get("field_names")).collect(),
        event_fields: string_list(v.get("event_fields")).collect(),
        operation: v
            .get("operation")
            .and_then(Value::as_str)
            .map(Operation::parse)
            .unwrap_or_default(),
        use_case: v
            .get("usecase")
            .and_then(Value::as_str)
            .and_then(canonical_use_case),
    };
    q.enforce_disjoint();
    q
}

fn loose_bool(v: Option<&Value>) -> TriState {
    match v {
        Some(Value::Bool(b)) => (*b).into(),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => TriState::True,
            "false" | "no" => TriState::False,
            _ => TriState::Unknown,
        },
        _ => TriState::Unknown,
    }
}

fn string_list(v: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    v.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(canonical_field)
}

fn canonical_field(name: &str) -> String {
    lexicon::KNOWN_FIELDS
        .iter()
        .find(|k| k.eq_ignore_ascii_case(name))
        .map(|k| k.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn canonical_use_case(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() || lower == "null" || lower == "none" {
        return None;
    }
    let canonical = lexicon::USE_CASES
        .iter()
        .find(|(kw, _)| *kw == lower)
        .map(|(_, c)| c.to_string());
    Some(canonical.unwrap_or(lower))
}

/// Keyword heuristics over the current utterance and the user turns of this request.
pub fn fallback_extract(utterance: &str, context: &ConversationWindow, prior: &QueryInfo) -> QueryInfo {
    let current = utterance.to_lowercase();
    let scoped = request_scope(context);
    // newest first; earlier questions about fields are not answers
    let mut user_texts: Vec<String> = vec![current.clone()];
    user_texts.extend(
        scoped
            .user_turns()
            .rev()
            .map(|t| t.content.to_lowercase())
            .filter(|t| !is_explanation(t)),
    );

    let mut pairs: Vec<(String, String)> = scoped
        .question_answer_pairs()
        .map(|(q, a)| (q.to_lowercase(), a.to_lowercase()))
        .collect();
    if let Some(last) = scoped.last_assistant() {
        pairs.push((last.content.to_lowercase(), current.clone()));
    }

    let mut q = QueryInfo::new();
    q.use_case = user_texts.iter().find_map(|t| use_case_in(t));
    q.operation = operation_in(&current);
    q.is_async = resolve_flag(&user_texts, &pairs, ASYNC_TERMS, SYNC_TERMS);
    q.is_umi_compliant = resolve_flag(&user_texts, &pairs, UMI_TERMS, &[]);
    q.is_private = user_texts
        .iter()
        .map(|t| privacy_in(t))
        .find(|v| v.is_known())
        .unwrap_or_default();

    let answering_event_question = context
        .last_assistant()
        .map(|t| contains_term(&t.content.to_lowercase(), "event"))
        .unwrap_or(false)
        && !prior.field_names.is_empty();
    for (i, text) in user_texts.iter().enumerate() {
        let start_in_event = i == 0 && answering_event_question;
        collect_fields(text, start_in_event, &mut q);
    }
    q.enforce_disjoint();
    q
}

/// Turns belonging to the request in progress: everything after the last delivered
/// recommendation, starting at the latest user turn that opened a fresh request.
fn request_scope(context: &ConversationWindow) -> ConversationWindow {
    let turns = context.turns();
    let finished = turns
        .iter()
        .rposition(|t| t.role == Role::Assistant && t.content.starts_with(RECOMMENDATION_HEADER))
        .map(|i| i + 1)
        .unwrap_or(0);
    let opened = turns
        .iter()
        .rposition(|t| t.role == Role::User && is_new_request(&t.content, context))
        .unwrap_or(0);
    ConversationWindow::new(turns[finished.max(opened)..].to_vec())
}

fn use_case_in(text: &str) -> Option<String> {
    let cued = contains_any(text, &["usecase", "use case", "build"]);
    if !cued {
        return None;
    }
    lexicon::USE_CASES
        .iter()
        .find(|(kw, _)| contains_term(text, kw))
        .map(|(_, c)| c.to_string())
}

/// Earliest operation word in the text
fn operation_in(text: &str) -> Operation {
    lexicon::OPERATION_WORDS
        .iter()
        .filter_map(|w| term_positions(text, w).first().map(|p| (*p, *w)))
        .min_by_key(|(p, _)| *p)
        .map(|(_, w)| Operation::parse(w))
        .unwrap_or_default()
}

/// Resolve a yes/no slot: direct mention in a user turn first, then a bare answer to a
/// question that asked about this slot alone.
fn resolve_flag(
    user_texts: &[String],
    pairs: &[(String, String)],
    terms: &[&str],
    opposite_terms: &[&str],
) -> TriState {
    for text in user_texts {
        let v = direct_flag(text, terms, opposite_terms);
        if v.is_known() {
            return v;
        }
    }
    for (question, answer) in pairs.iter().rev() {
        if !contains_any(question, terms) || contains_any(answer, terms) || !asks_single_flag(question) {
            continue;
        }
        let v = yes_no_answer(answer);
        if v.is_known() {
            return v;
        }
    }
    TriState::Unknown
}

/// A bare "yes" cannot be attributed when one message asks several yes/no questions
fn asks_single_flag(question: &str) -> bool {
    let topics: [&[&str]; 3] = [
        &["async", "asynchronous", "sync", "synchronous"],
        UMI_TERMS,
        PRIVACY_TERMS,
    ];
    topics.iter().filter(|terms| contains_any(question, terms)).count() == 1
}

/// Value stated next to the keyword in one text; the last mention wins
fn direct_flag(text: &str, terms: &[&str], opposite_terms: &[&str]) -> TriState {
    let mut found: Option<(usize, TriState)> = None;
    for term in terms {
        for pos in term_positions(text, term) {
            let before = tail_chars(&text[..pos], 24);
            let after = head_chars(&text[pos + term.len()..], 24);
            let value = match ANSWER_AFTER.captures(after).and_then(|c| c.get(1)) {
                Some(m) if lexicon::NEGATIVE.contains(&m.as_str()) => TriState::False,
                Some(_) => TriState::True,
                None if NEG_BEFORE.is_match(before) => TriState::False,
                None => TriState::True,
            };
            if found.map(|(p, _)| pos >= p).unwrap_or(true) {
                found = Some((pos, value));
            }
        }
    }
    if found.is_none() && contains_any(text, opposite_terms) {
        return TriState::False;
    }
    found.map(|(_, v)| v).unwrap_or_default()
}

/// Bare yes/no answer; mixed polarity stays unknown
fn yes_no_answer(answer: &str) -> TriState {
    let words: Vec<&str> = answer
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let yes = words.iter().any(|w| lexicon::AFFIRMATIVE.contains(w));
    let no = words.iter().any(|w| lexicon::NEGATIVE.contains(w));
    match (yes, no) {
        (true, false) => TriState::True,
        (false, true) => TriState::False,
        _ => TriState::Unknown,
    }
}

fn privacy_in(text: &str) -> TriState {
    let private = term_positions(text, "private");
    let public = term_positions(text, "public");
    let negated = |positions: &[usize]| {
        positions
            .iter()
            .any(|p| NEG_BEFORE.is_match(tail_chars(&text[..*p], 24)))
    };
    match (private.is_empty(), public.is_empty()) {
        (true, true) => TriState::Unknown,
        (false, true) if negated(&private) => TriState::False,
        (false, true) => TriState::True,
        (true, false) if negated(&public) => TriState::True,
        (true, false) => TriState::False,
        (false, false) if negated(&private) => TriState::False,
        (false, false) => TriState::True,
    }
}

/// Known field names in one text, routed to the request or event set by the nearest cue before them
fn collect_fields(text: &str, start_in_event: bool, q: &mut QueryInfo) {
    let mut cues: Vec<(usize, bool)> = Vec::new();
    for cue in ["event", "events"] {
        cues.extend(term_positions(text, cue).into_iter().map(|p| (p, true)));
    }
    for cue in ["request", "main payload"] {
        cues.extend(term_positions(text, cue).into_iter().map(|p| (p, false)));
    }
    cues.sort_unstable();

    for field in lexicon::KNOWN_FIELDS {
        let needle = field.to_lowercase();
        for pos in exact_term_positions(text, &needle) {
            if EXPLAIN_BEFORE.is_match(tail_chars(&text[..pos], 32)) {
                continue;
            }
            let in_event = cues
                .iter()
                .take_while(|(p, _)| *p < pos)
                .last()
                .map(|(_, event)| *event)
                .unwrap_or(start_in_event);
            if in_event {
                q.event_fields.insert(field.to_string());
            } else {
                q.field_names.insert(field.to_string());
            }
        }
    }
}

fn tail_chars(s: &str, n: usize) -> &str {
    match s.char_indices().rev().nth(n.saturating_sub(1)) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

fn head_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn extraction_prompt(utterance: &str, context: &ConversationWindow) -> String {
    let context_block = if context.is_empty() {
        "No earlier context: this is a fresh request. Use only the current message and leave \
         event_fields empty unless the message itself names event fields."
            .to_string()
    } else {
        format!(
            "Conversation so far (the user is answering follow-up questions):\n{}\n\n\
             Pair each assistant question with the user reply that follows it:\n\
             - \"Is this request async?\" followed by yes/no sets is_async\n\
             - \"Is this UMI compliant?\" followed by yes/no sets is_umi_compliant\n\
             - \"Is this private or public?\" followed by private/public sets is_private\n\
             - field names the user lists belong to field_names unless they are given for the event",
            context.to_buffer_string()
        )
    };

    format!(
        r#"Extract the details of a UMI API creation request.

Current user message: {utterance:?}

{context_block}

Extract:
1. usecase: "insurance", "fd", "gold bond", "bond", "mutual fund" or null
2. operation: "create" (also issue), "burn" (also manage), "trade" (also settle) or null
3. is_async: true, false or null
4. is_umi_compliant: true, false or null
5. is_private: true for private data, false for public, or null
6. field_names: fields for the REQUEST payload only
7. event_fields: fields for the EVENT payload only (named after the user talks about the event)

Separation rules:
- "request payload will have X, Y" puts X and Y in field_names only.
- "event will have A, B" puts A and B in event_fields only.
- A name never appears in both lists.
- Use null only when the information is not present in this request's conversation.
- Ignore details from earlier, unrelated requests.

Return ONLY a JSON object:
{{"usecase": null, "operation": null, "is_async": null, "is_umi_compliant": null, "is_private": null, "field_names": [], "event_fields": []}}"#
    )
}
