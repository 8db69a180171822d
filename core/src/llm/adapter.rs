use crate::context::{PromptBundle, TokenBudget};
use serde_json::json;

// ~4 chars per token
const CHARS_PER_TOKEN: usize = 4;

/// Convert PromptBundle into chat messages and a single fused text for the Responses API.
///
/// Oldest history lines are dropped first when the bundle exceeds the input budget;
/// instructions are truncated only when history alone cannot make room.
pub fn promptbundle_to_messages_and_text(
    bundle: &PromptBundle,
    budget: TokenBudget,
) -> (Vec<serde_json::Value>, String) {
    let char_budget = budget.max_input_tokens.saturating_mul(CHARS_PER_TOKEN);

    let system = bundle.system.as_str();
    let context_block = if bundle.context_docs.is_empty() {
        String::new()
    } else {
        let mut block = String::from("Context:\n");
        for d in &bundle.context_docs {
            block.push_str("- ");
            block.push_str(d);
            block.push('\n');
        }
        block
    };

    let mut history: &[String] = &bundle.history;
    let mut assembled = system.len()
        + context_block.len()
        + bundle.instructions.len()
        + history.iter().map(|s| s.len()).sum::<usize>();
    while assembled > char_budget && !history.is_empty() {
        assembled -= history[0].len();
        history = &history[1..];
    }

    let instructions: String = if assembled > char_budget {
        // char-based so we never split a UTF-8 sequence
        let allowed =
            char_budget.saturating_sub(system.chars().count() + context_block.chars().count());
        bundle.instructions.chars().take(allowed).collect()
    } else {
        bundle.instructions.clone()
    };

    let mut messages = Vec::new();
    if !system.is_empty() {
        messages.push(json!({"role": "system", "content": system}));
    }
    if !context_block.is_empty() {
        messages.push(json!({"role": "system", "content": context_block}));
    }
    for h in history {
        messages.push(json!({"role": "user", "content": h}));
    }
    if !instructions.is_empty() {
        messages.push(json!({"role": "user", "content": instructions}));
    }

    let mut fused = String::new();
    if !system.is_empty() {
        fused.push_str("System:\n");
        fused.push_str(system);
        fused.push_str("\n\n");
    }
    if !context_block.is_empty() {
        fused.push_str(&context_block);
        fused.push('\n');
    }
    if !history.is_empty() {
        fused.push_str("History:\n");
        for h in history {
            fused.push_str("- ");
            fused.push_str(h);
            fused.push('\n');
        }
        fused.push('\n');
    }
    if !instructions.is_empty() {
        fused.push_str("User:\n");
        fused.push_str(&instructions);
        fused.push('\n');
    }

    (messages, fused)
}
