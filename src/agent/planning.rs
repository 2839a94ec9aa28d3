//! Planning agent.
//!
//! Decomposes the research question into objectives, sub-questions and at
//! most three search queries. A failed model call is fatal for the turn;
//! an unreadable reply falls back to searching for the question itself.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::artifact::{Plan, strip_code_fence};
use super::config::AgentConfig;
use super::prompt::build_planning_prompt;
use super::provider::LlmProvider;
use super::tool::CREATE_PLAN;
use super::traits::{Agent, AgentResponse, SubAgent};
use crate::error::AgentError;

/// Agent that plans the research for a query.
pub struct PlanningAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl PlanningAgent {
    /// Creates a new planning agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            provider,
            model: config.planning_model.clone(),
            max_tokens: config.agent_max_tokens,
            system_prompt,
        }
    }

    /// Executes the agent and parses the research plan.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails.
    pub async fn plan(&self, query: &str) -> Result<(Plan, AgentResponse), AgentError> {
        let response = self
            .execute(self.provider.as_ref(), &build_planning_prompt(query))
            .await?;
        let plan = Self::parse_plan(&response.content, query);
        debug!(queries = ?plan.queries, "research plan ready");
        Ok((plan, response))
    }

    /// Parses the model reply, falling back to [`Plan::from_query`].
    fn parse_plan(content: &str, query: &str) -> Plan {
        match serde_json::from_str::<Plan>(strip_code_fence(content)) {
            Ok(plan) => plan.normalized(query),
            Err(e) => {
                warn!(error = %e, "plan reply was not valid JSON, searching for the query itself");
                Plan::from_query(query)
            }
        }
    }
}

impl std::fmt::Debug for PlanningAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningAgent")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Agent for PlanningAgent {
    fn name(&self) -> &'static str {
        "planning"
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
impl SubAgent for PlanningAgent {
    fn name(&self) -> &'static str {
        CREATE_PLAN
    }

    fn description(&self) -> &'static str {
        "Create a JSON research plan with up to 3 queries."
    }

    async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError> {
        let query = payload.trim();
        if query.is_empty() {
            return Err(AgentError::ToolExecution {
                name: CREATE_PLAN.to_string(),
                message: "empty query".to_string(),
            });
        }
        let (plan, response) = self.plan(query).await?;
        let content = serde_json::to_string(&plan).map_err(|e| AgentError::ToolExecution {
            name: CREATE_PLAN.to_string(),
            message: format!("serialization error: {e}"),
        })?;
        Ok(AgentResponse {
            content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
