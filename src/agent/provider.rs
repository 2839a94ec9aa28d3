//! Model backend seam.
//!
//! The query, planning, reflection and synthesis agents only ever talk to
//! a `dyn LlmProvider`. Tests swap in scripted providers that route on the
//! system prompt.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// A chat-completion backend.
///
/// One request in, one reply out. No retries here: a failed completion is
/// reported as an [`AgentError`] and the calling agent decides whether the
/// turn can degrade or must fail.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short label used in logs (`"openai"`, `"gemini"`).
    fn name(&self) -> &'static str;

    /// Runs one chat completion.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the request fails or the model refuses.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}
