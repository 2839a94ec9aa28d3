//! Agent trait definitions.
//!
//! [`Agent`] is a model-backed role with a fixed system prompt (query
//! classification, planning, reflection, synthesis). [`SubAgent`] is the
//! uniform payload-in, payload-out contract every research tool satisfies,
//! whether or not it calls a model.

use async_trait::async_trait;

use super::message::{ChatMessage, ChatRequest, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

impl AgentResponse {
    /// A response produced without a model call.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Trait implemented by model-backed agents.
///
/// Agents encapsulate a specific role with a fixed system prompt and model
/// configuration. Callers run them with [`Agent::execute`], or
/// [`Agent::execute_with_history`] when prior conversation matters.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute_with_history(provider, &[], user_msg).await
    }

    /// Executes the agent with prior conversation placed between the system
    /// prompt and the new user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute_with_history(
        &self,
        provider: &dyn LlmProvider,
        history: &[ChatMessage],
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system_message(self.system_prompt()));
        messages.extend_from_slice(history);
        messages.push(user_message(user_msg));

        let request = ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
        };

        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// A research sub-agent callable as a tool.
///
/// Input and output are text payloads (usually JSON). Implementations
/// return their documented sentinel instead of an error for empty or
/// malformed input, so only genuinely fatal conditions surface as `Err`.
#[async_trait]
pub trait SubAgent: Send + Sync {
    /// Tool name the sub-agent is registered under.
    fn name(&self) -> &'static str;

    /// One-line description shown in tool definitions.
    fn description(&self) -> &'static str;

    /// Processes one payload.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] only for failures the caller must not paper
    /// over (for planning, a failed model call).
    async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError>;
}
