//! Front-line query agent.
//!
//! Classifies each turn as a greeting, a research request or an ambiguous
//! message and returns a [`Dispatch`]. Research is never answered here; it is
//! handed to the orchestrator as [`Dispatch::Delegate`].

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::artifact::strip_code_fence;
use super::config::AgentConfig;
use super::message::ChatMessage;
use super::prompt::build_query_prompt;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Clarifying question used when the model reply cannot be read.
pub const DEFAULT_CLARIFICATION: &str =
    "Could you clarify what you would like me to research?";

fn greeting_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        match Regex::new(
            r"(?i)^\s*(hi|hello|hey|hey there|hi there|hello there|greetings|good (morning|afternoon|evening))\s*[!.,]*\s*$",
        ) {
            Ok(re) => re,
            Err(_) => unreachable!("static regex pattern is valid"),
        }
    })
}

/// Returns `true` for a bare salutation.
#[must_use]
pub fn is_greeting(input: &str) -> bool {
    greeting_regex().is_match(input)
}

/// Classification of a user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Salutation or small talk.
    Greeting,
    /// Needs web research.
    Research,
    /// Unclear intent.
    Ambiguous,
}

/// Who receives a delegated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateTarget {
    /// The research orchestrator.
    Orchestrator,
}

/// What the runner should do with a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Show this text to the user.
    Reply(String),
    /// Hand the standalone query to another agent.
    Delegate {
        /// Receiving agent.
        target: DelegateTarget,
        /// Standalone research question.
        query: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Classification {
    mode: Option<QueryMode>,
    #[serde(default)]
    reply: String,
    #[serde(default)]
    query: String,
}

/// Agent that classifies user turns.
pub struct QueryAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    greeting: String,
}

impl QueryAgent {
    /// Creates a query agent.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.query_model.clone(),
            max_tokens: config.agent_max_tokens,
            system_prompt,
            greeting: config.greeting.clone(),
        }
    }

    /// Classifies `input` given earlier conversation.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails.
    pub async fn classify(
        &self,
        history: &[ChatMessage],
        input: &str,
    ) -> Result<(Dispatch, AgentResponse), AgentError> {
        let input = input.trim();
        if is_greeting(input) {
            debug!("greeting fast path");
            return Ok((
                Dispatch::Reply(self.greeting.clone()),
                AgentResponse::default(),
            ));
        }

        let response = self
            .execute_with_history(self.provider.as_ref(), history, &build_query_prompt(input))
            .await?;
        let dispatch = self.dispatch_for(&response.content, input);
        debug!(?dispatch, "turn classified");
        Ok((dispatch, response))
    }

    fn dispatch_for(&self, content: &str, input: &str) -> Dispatch {
        let parsed = serde_json::from_str::<Classification>(strip_code_fence(content))
            .unwrap_or_else(|e| {
                warn!(error = %e, "classification reply was not valid JSON");
                Classification::default()
            });

        match parsed.mode {
            Some(QueryMode::Greeting) => Dispatch::Reply(self.greeting.clone()),
            Some(QueryMode::Research) => {
                let query = parsed.query.trim();
                Dispatch::Delegate {
                    target: DelegateTarget::Orchestrator,
                    query: if query.is_empty() { input } else { query }.to_string(),
                }
            }
            Some(QueryMode::Ambiguous) | None => Dispatch::Reply(clarifying_question(&parsed.reply)),
        }
    }
}

/// Keeps only the first question of a clarification, or the default.
fn clarifying_question(reply: &str) -> String {
    let reply = reply.trim();
    match reply.find('?') {
        Some(end) => reply[..=end].to_string(),
        None if reply.is_empty() => DEFAULT_CLARIFICATION.to_string(),
        None => format!("{}?", reply.trim_end_matches('.')),
    }
}

impl std::fmt::Debug for QueryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAgent")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Agent for QueryAgent {
    fn name(&self) -> &'static str {
        "query"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage, user_message};
    use crate::agent::prompt::QUERY_SYSTEM_PROMPT;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use test_case::test_case;

    struct ScriptedProvider {
        reply: &'static str,
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            Ok(ChatResponse {
                content: self.reply.to_string(),
                usage: TokenUsage::default(),
                finish_reason: None,
            })
        }
    }

    fn agent(reply: &'static str) -> (QueryAgent, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let config = AgentConfig::builder()
            .api_key("k")
            .search_api_key("t")
            .greeting("Hello there!")
            .build()
            .unwrap_or_else(|_| unreachable!());
        (
            QueryAgent::new(provider.clone(), &config, QUERY_SYSTEM_PROMPT.to_string()),
            provider,
        )
    }

    fn calls(provider: &ScriptedProvider) -> usize {
        provider.seen.lock().map(|s| s.len()).unwrap_or_default()
    }

    #[test_case("hi" => true)]
    #[test_case("Hello!" => true)]
    #[test_case("hey there!" => true)]
    #[test_case("  Good morning. " => true)]
    #[test_case("hi, compare EVs and gas cars" => false)]
    #[test_case("history of hello kitty" => false)]
    fn test_is_greeting(input: &str) -> bool {
        is_greeting(input)
    }

    #[tokio::test]
    async fn test_greeting_skips_model() {
        let (agent, provider) = agent("{}");
        let (dispatch, _) = agent.classify(&[], "hi").await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dispatch, Dispatch::Reply("Hello there!".to_string()));
        assert_eq!(calls(&provider), 0);
    }

    #[tokio::test]
    async fn test_research_delegated_with_rewritten_query() {
        let (agent, provider) = agent(
            r#"{"mode":"research","reply":"","query":"Compare electric and gas car running costs"}"#,
        );
        let history = vec![user_message("tell me about electric cars")];
        let (dispatch, _) = agent
            .classify(&history, "how do they compare with gas cars on cost?")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            dispatch,
            Dispatch::Delegate {
                target: DelegateTarget::Orchestrator,
                query: "Compare electric and gas car running costs".to_string(),
            }
        );
        let seen = provider.seen.lock().map(|s| s.clone()).unwrap_or_default();
        assert_eq!(seen[0].messages.len(), 3);
        assert!(seen[0].json_mode);
    }

    #[tokio::test]
    async fn test_research_without_rewrite_uses_input() {
        let (agent, _) = agent(r#"{"mode":"research"}"#);
        let (dispatch, _) = agent
            .classify(&[], "EV vs gas")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(dispatch, Dispatch::Delegate { query, .. } if query == "EV vs gas"));
    }

    #[tokio::test]
    async fn test_ambiguous_keeps_single_question() {
        let (agent, _) = agent(
            r#"{"mode":"ambiguous","reply":"Which cars do you mean? And which years?"}"#,
        );
        let (dispatch, _) = agent.classify(&[], "cars").await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dispatch, Dispatch::Reply("Which cars do you mean?".to_string()));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_ambiguous() {
        let (agent, _) = agent("Sure! Let me research that.");
        let (dispatch, _) = agent.classify(&[], "stuff").await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dispatch, Dispatch::Reply(DEFAULT_CLARIFICATION.to_string()));
    }

    #[tokio::test]
    async fn test_model_greeting_uses_configured_text() {
        let (agent, _) = agent(r#"{"mode":"greeting","reply":"yo"}"#);
        let (dispatch, _) = agent
            .classify(&[], "how are you doing today")
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(dispatch, Dispatch::Reply("Hello there!".to_string()));
    }
}
