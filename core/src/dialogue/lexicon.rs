//! Static keyword tables used by the deterministic fallbacks.
//!
//! Matching is case-insensitive on word boundaries. Keyword lookups accept a trailing
//! plural `s` so "assets" matches "asset"; field names match exactly.

use super::slots::Operation;

/// Purchase and vehicle terms that mark an utterance as off-topic
pub const OFF_TOPIC: &[&str] = &[
    "buy",
    "purchase",
    "sell",
    "lamborghini",
    "lamborgini",
    "car",
    "vehicle",
    "shopping",
];

/// Domain terms that suppress an off-topic match
pub const DOMAIN: &[&str] = &["asset", "bond", "token", "transaction", "api", "payload"];

/// Explanation phrasing; these utterances are questions, not requests
pub const EXPLANATION: &[&str] = &[
    "explain",
    "what is",
    "what's",
    "what are",
    "what does",
    "tell me about",
    "how does",
    "describe",
    "meaning of",
];

pub const CREATION_VERBS: &[&str] = &[
    "create", "make", "generate", "build", "new", "want to", "need to", "burn", "lock", "issue",
];

/// Nouns that, together with a creation verb, open a fresh request
pub const NEW_REQUEST_NOUNS: &[&str] = &[
    "asset",
    "bond",
    "transaction",
    "token",
    "gold",
    "usecase",
    "use case",
    "insurance",
    "fd",
    "fixed deposit",
    "mutual fund",
];

pub const AFFIRMATIVE: &[&str] = &["yes", "y", "yeah", "yep", "yup", "true", "sure", "correct"];
pub const NEGATIVE: &[&str] = &["no", "n", "nope", "false", "not"];

/// Use-case keywords mapped to their canonical name, longest phrase first
pub const USE_CASES: &[(&str, &str)] = &[
    ("fixed deposit", "fd"),
    ("gold bond", "gold bond"),
    ("mutual fund", "mutual fund"),
    ("insurance", "insurance"),
    ("bond", "bond"),
    ("fd", "fd"),
    ("mf", "mutual fund"),
];

/// Words that name an operation
pub const OPERATION_WORDS: &[&str] = &["create", "issue", "burn", "manage", "trade", "settle"];

/// Field names the fallback extractor recognizes, in canonical spelling
pub const KNOWN_FIELDS: &[&str] = &[
    "id",
    "value",
    "key",
    "toWalletAddress",
    "fromWalletAddress",
    "walletAddress",
    "requestId",
    "msgId",
    "name",
    "type",
    "eventType",
    "timestamp",
    "startYear",
    "endYear",
    "policyNumber",
    "premium",
    "coverageAmount",
    "principal",
    "interestRate",
    "tenure",
    "maturityDate",
    "quantity",
    "purity",
    "price",
    "units",
    "nav",
    "investmentAmount",
];

/// Suggested request fields for a use case and operation.
///
/// An unset operation falls back to the create list; unknown use cases have no suggestions.
pub fn suggested_fields(use_case: &str, op: Operation) -> &'static [&'static str] {
    let use_case = use_case.trim().to_ascii_lowercase();
    match (use_case.as_str(), op) {
        ("insurance", Operation::Burn) => &["policyNumber", "type", "id"],
        ("insurance", Operation::Trade) => &["policyNumber", "type", "id", "value"],
        ("insurance", _) => &[
            "startYear",
            "endYear",
            "policyNumber",
            "premium",
            "coverageAmount",
            "type",
        ],
        ("fd", Operation::Burn) => &["id", "type", "principal"],
        ("fd", Operation::Trade) => &["id", "type", "value", "principal"],
        ("fd", _) => &["principal", "interestRate", "tenure", "maturityDate", "type"],
        ("gold bond" | "bond", Operation::Burn) => &["id", "type", "quantity"],
        ("gold bond" | "bond", Operation::Trade) => &["id", "type", "value", "quantity"],
        ("gold bond" | "bond", _) => &["quantity", "purity", "price", "type", "id"],
        ("mutual fund", Operation::Burn) => &["id", "type", "units"],
        ("mutual fund", Operation::Trade) => &["id", "type", "value", "units"],
        ("mutual fund", _) => &["units", "nav", "investmentAmount", "type", "id"],
        _ => &[],
    }
}

/// Byte offsets where `term` (or its plural) occurs in `text` on word boundaries.
///
/// Both arguments are expected lowercase.
pub fn term_positions(text: &str, term: &str) -> Vec<usize> {
    positions(text, term, true)
}

/// Like [`term_positions`] without the plural, so "names" is not the field `name`
pub fn exact_term_positions(text: &str, term: &str) -> Vec<usize> {
    positions(text, term, false)
}

fn positions(text: &str, term: &str, plural: bool) -> Vec<usize> {
    let bytes = text.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find(term) {
        let start = from + rel;
        let mut end = start + term.len();
        let before_ok = start == 0 || !is_word(bytes[start - 1]);
        if plural && end < bytes.len() && bytes[end] == b's' && (end + 1 == bytes.len() || !is_word(bytes[end + 1])) {
            end += 1;
        }
        let after_ok = end == bytes.len() || !is_word(bytes[end]);
        if before_ok && after_ok {
            out.push(start);
        }
        from = start + term.len().max(1);
        if from >= text.len() {
            break;
        }
    }
    out
}

pub fn contains_term(text: &str, term: &str) -> bool {
    !term_positions(text, term).is_empty()
}

pub fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(text, t))
}

pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Utterance is a bare yes/no answer ("yes", "no thanks", "y")
pub fn is_yes_no(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    matches!(words.first(), Some(w) if AFFIRMATIVE.contains(w) || NEGATIVE.contains(w))
        && words.len() <= 3
}
