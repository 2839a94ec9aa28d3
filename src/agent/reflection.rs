//! Reflection sub-agent.
//!
//! Asks the model for biases, gaps, insights and conflicts in the gathered
//! data. A failed call or unreadable reply degrades to an empty reflection,
//! which reports no gaps and therefore never triggers another cycle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::artifact::{AnalysisInput, Reflection};
use super::config::AgentConfig;
use super::prompt::build_reflection_prompt;
use super::provider::LlmProvider;
use super::tool::REFLECT_DATA;
use super::traits::{Agent, AgentResponse, SubAgent};
use crate::error::AgentError;
use crate::search::SearchResultSet;

/// Agent that critiques research data.
pub struct ReflectionAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ReflectionAgent {
    /// Creates a new reflection agent.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.reflection_model.clone(),
            max_tokens: config.agent_max_tokens,
            system_prompt,
        }
    }

    /// Reflects on `data` given its serialized ratings.
    pub async fn reflect(&self, data: &SearchResultSet, ratings: &str) -> (Reflection, AgentResponse) {
        if data.is_empty() {
            return (Reflection::no_data(), AgentResponse::default());
        }

        let prompt = build_reflection_prompt(data, ratings);
        let response = match self.execute(self.provider.as_ref(), &prompt).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "reflection call failed, continuing without reflection");
                return (Reflection::default(), AgentResponse::default());
            }
        };

        let reflection = Reflection::parse(&response.content).map_or_else(
            || {
                warn!("reflection reply was not valid JSON, continuing without reflection");
                Reflection::default()
            },
            Reflection::normalized,
        );
        debug!(
            gaps = reflection.gaps.len(),
            insights = reflection.insights.len(),
            suggested = reflection.suggested_queries.len(),
            "reflection complete"
        );
        (reflection, response)
    }
}

impl std::fmt::Debug for ReflectionAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReflectionAgent")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Agent for ReflectionAgent {
    fn name(&self) -> &'static str {
        "reflection"
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

#[async_trait]
impl SubAgent for ReflectionAgent {
    fn name(&self) -> &'static str {
        REFLECT_DATA
    }

    fn description(&self) -> &'static str {
        "Analyze data for biases, gaps, insights, and conflicts."
    }

    async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError> {
        let input = AnalysisInput::parse(payload).unwrap_or_default();
        let data = SearchResultSet::parse(&input.raw_data)
            .or_else(|| {
                // A bare result set is accepted in place of the wrapped form.
                input
                    .raw_data
                    .is_empty()
                    .then(|| SearchResultSet::parse(payload))
                    .flatten()
            })
            .unwrap_or_default();

        let (reflection, response) = self.reflect(&data, &input.ratings).await;
        let content = serde_json::to_string(&reflection).map_err(|e| AgentError::ToolExecution {
            name: REFLECT_DATA.to_string(),
            message: format!("serialization error: {e}"),
        })?;
        Ok(AgentResponse {
            content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::prompt::REFLECTION_SYSTEM_PROMPT;
    use crate::search::fallback_results;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        reply: Result<&'static str, ()>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(ChatResponse {
                    content: text.to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    },
                    finish_reason: Some("stop".to_string()),
                }),
                Err(()) => Err(AgentError::ApiRequest {
                    message: "503".to_string(),
                    status: Some(503),
                }),
            }
        }
    }

    fn agent(reply: Result<&'static str, ()>) -> (ReflectionAgent, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider {
            reply,
            calls: AtomicUsize::new(0),
        });
        let config = AgentConfig::builder()
            .api_key("k")
            .search_api_key("t")
            .build()
            .unwrap_or_else(|_| unreachable!());
        (
            ReflectionAgent::new(provider.clone(), &config, REFLECTION_SYSTEM_PROMPT.to_string()),
            provider,
        )
    }

    fn payload() -> String {
        AnalysisInput::new(fallback_results().to_payload(), "[]").to_payload()
    }

    #[tokio::test]
    async fn test_empty_data_reports_no_data_gap_without_model_call() {
        let (agent, provider) = agent(Ok("{}"));
        let out = agent
            .invoke(&AnalysisInput::new(r#"{"results":[]}"#, "").to_payload())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let reflection = Reflection::parse(&out.content).unwrap_or_default();
        assert_eq!(reflection, Reflection::no_data());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_reply_parsed_and_capped() {
        let (agent, _) = agent(Ok(
            r#"{"biases":["vendor data"],"gaps":["no resale values"],"insights":[],"conflicts":[],"suggested_queries":["a","b","c","d"]}"#,
        ));
        let out = agent.invoke(&payload()).await.unwrap_or_else(|e| panic!("{e}"));
        let reflection = Reflection::parse(&out.content).unwrap_or_default();
        assert_eq!(reflection.gaps, vec!["no resale values"]);
        assert_eq!(reflection.suggested_queries.len(), 3);
        assert_eq!(out.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_bare_result_set_accepted() {
        let (agent, provider) = agent(Ok(r#"{"gaps":[]}"#));
        let _ = agent.invoke(&fallback_results().to_payload()).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_empty() {
        let (agent, _) = agent(Err(()));
        let out = agent.invoke(&payload()).await.unwrap_or_else(|e| panic!("{e}"));
        let reflection = Reflection::parse(&out.content).unwrap_or_else(Reflection::no_data);
        assert_eq!(reflection, Reflection::default());
        assert!(!reflection.has_gaps());
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades_to_empty() {
        let (agent, _) = agent(Ok("I think the data is biased."));
        let out = agent.invoke(&payload()).await.unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(Reflection::parse(&out.content), Some(Reflection::default()));
    }
}
