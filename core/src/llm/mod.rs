//! LLM module: completion port, HTTP client and prompt adapter
//!
//! This module provides:
//! - `CompletionPort`, the text-in/text-out seam every pipeline stage talks to
//! - `LlmClientConfig`, `LlmClient`, `LlmResponse` for talking to OpenAI-compatible backends
//! - `promptbundle_to_messages_and_text` adapter for turning `PromptBundle` into payloads

mod adapter;
mod client;
mod port;

pub use adapter::promptbundle_to_messages_and_text;
pub use client::{LlmClient, LlmClientConfig, LlmResponse};
pub use port::CompletionPort;
