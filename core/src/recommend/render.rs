//! Text rendering of recommendations and of the request text fed to the engine.

use crate::context::ConversationWindow;
use std::fmt::Write;

use super::engine::Recommendation;

/// First line of every rendered recommendation
pub const RECOMMENDATION_HEADER: &str = "Recommended API:";

/// Render a recommendation as the assistant's reply
pub fn format_recommendation(rec: &Recommendation) -> String {
    let api = &rec.api;
    let mut out = format!("{RECOMMENDATION_HEADER}\n");
    let _ = writeln!(out, " Name: {}", api.name);
    let _ = writeln!(out, " Path: {}", api.path);
    let _ = writeln!(out, " Method: {}", api.method);
    let _ = writeln!(out, " Description: {}", api.description);

    if rec.fields.is_empty() {
        out.push_str("Suggested fields: not required\n");
    } else {
        out.push_str("Suggested fields:\n");
        for f in &rec.fields {
            let _ = writeln!(out, " - {} ({}): {}", f.name, f.field_type, f.description);
        }
    }

    push_block(&mut out, "Sample payload:", &rec.payload);
    push_block(&mut out, "Event payload:", &rec.event_payload);
    out.trim().to_string()
}

fn push_block(out: &mut String, title: &str, body: &str) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    out.push_str(title);
    out.push('\n');
    out.push_str(body);
    out.push('\n');
}

/// Latest utterance, prefixed by the conversation so far when there is one
pub fn compose_conversation_aware_request(history: &ConversationWindow, latest: &str) -> String {
    let latest = latest.trim();
    if history.is_empty() {
        return latest.to_string();
    }
    format!(
        "Conversation so far:\n{}\n\nLatest user request: {latest}",
        history.to_buffer_string()
    )
}
