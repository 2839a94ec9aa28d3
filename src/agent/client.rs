//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations and
//! builds the default search backend. Both are constructed once at startup
//! and shared by reference count.

use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::error::AgentError;
use crate::search::{SearchBackend, TavilyBackend};

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
/// - `"gemini"`: alias for the same client; the base URL selects the endpoint
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" | "gemini" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates the web search backend.
///
/// The HTTP client timeout matches the per-attempt search timeout so a
/// stalled connection is cut off at the same deadline.
#[must_use]
pub fn create_search_backend(config: &AgentConfig) -> Arc<dyn SearchBackend> {
    Arc::new(TavilyBackend::new(
        config.search_api_key.clone(),
        config.search.timeout,
    ))
}
