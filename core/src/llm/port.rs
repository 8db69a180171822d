use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque text generator used by every stage of the dialogue pipeline.
///
/// Output is not guaranteed to be well formed. Callers that expect JSON must
/// run it through `dialogue::json::extract_object` before parsing.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[async_trait]
impl<T: CompletionPort + ?Sized> CompletionPort for Arc<T> {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        (**self).complete(prompt, temperature).await
    }
}
