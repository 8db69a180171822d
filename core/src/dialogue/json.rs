//! Best-effort extraction of a JSON object from generator output.
//!
//! Generators wrap JSON in prose, code fences or both. Candidates are tried in order:
//! 1. the whole trimmed text
//! 2. the span from the first `{` to the last `}`
//! 3. the body of a fenced code block
//! 4. every balanced `{...}` span, largest first
//!
//! The first candidate that parses as a JSON object wins.

use crate::{AssistError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Return the first candidate substring that parses as a JSON object
pub fn extract_object(text: &str) -> Option<Value> {
    candidates(text)
        .into_iter()
        .find_map(|c| match serde_json::from_str::<Value>(c) {
            Ok(v @ Value::Object(_)) => Some(v),
            _ => None,
        })
}

/// Extract and deserialize a JSON object, reporting a parse error with the raw text
pub fn parse_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value = extract_object(text)
        .ok_or_else(|| AssistError::Parse(format!("no JSON object in output: {}", snippet(text))))?;
    serde_json::from_value(value)
        .map_err(|e| AssistError::Parse(format!("{e}; raw={}", snippet(text))))
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let trimmed = text.trim();
    out.push(trimmed);

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            out.push(&trimmed[start..=end]);
        }
    }

    if let Some(body) = fenced_body(trimmed) {
        out.push(body);
    }

    let mut spans = balanced_spans(trimmed);
    spans.sort_by(|a, b| b.len().cmp(&a.len()));
    out.extend(spans);
    out
}

fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // skip the language tag line
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// Top-level and nested `{...}` spans with balanced braces, ignoring braces inside strings
fn balanced_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if !stack.is_empty() => in_string = true,
            '{' => stack.push(i),
            '}' => {
                if let Some(start) = stack.pop() {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
