//! Turn runner.
//!
//! Owns one chat turn from input to recorded output: classification by the
//! [`QueryAgent`], delegation to the [`Orchestrator`], the wall-clock turn
//! timeout, and containment of every runtime error as a user-facing message.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use super::artifact::ResearchReport;
use super::config::AgentConfig;
use super::message::{ChatMessage, assistant_message, user_message};
use super::orchestrator::Orchestrator;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::query::{DelegateTarget, Dispatch, QueryAgent};
use crate::error::{AgentError, StorageError};
use crate::search::SearchBackend;
use crate::storage::{SessionStore, Turn};

/// Shown when a turn exceeds its deadline.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please check your network and try again.";

/// User-facing text for an unexpected failure.
#[must_use]
pub fn failure_message(detail: &impl std::fmt::Display) -> String {
    format!("Error occurred: {detail}. Please try again or check API keys.")
}

/// How a turn ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Answered directly (greeting or clarifying question).
    Reply {
        /// Text shown to the user.
        message: String,
    },
    /// Delegated to research; the report may be completed or aborted.
    Research(ResearchReport),
    /// The turn deadline passed.
    TimedOut {
        /// Text shown to the user.
        message: String,
    },
    /// A runtime error was contained.
    Failed {
        /// Text shown to the user.
        message: String,
    },
}

impl TurnOutcome {
    /// The only text shown to the user for this turn.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Reply { message } | Self::TimedOut { message } | Self::Failed { message } => {
                message
            }
            Self::Research(report) => &report.response,
        }
    }
}

/// Runs chat turns against a session store.
pub struct TurnRunner {
    query_agent: QueryAgent,
    orchestrator: Orchestrator,
    store: Arc<dyn SessionStore>,
    turn_timeout: Duration,
    history_turns: usize,
}

impl TurnRunner {
    /// Creates a runner, loading prompt templates per [`PromptSet::load`].
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        store: Arc<dyn SessionStore>,
        config: &AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, search, store, config, &prompts)
    }

    /// Creates a runner with explicit prompts.
    #[must_use]
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        store: Arc<dyn SessionStore>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        Self {
            query_agent: QueryAgent::new(Arc::clone(&provider), config, prompts.query.clone()),
            orchestrator: Orchestrator::with_prompts(provider, search, config, prompts),
            store,
            turn_timeout: config.turn_timeout,
            history_turns: config.history_turns,
        }
    }

    /// Runs one turn and records it in the session.
    ///
    /// Never fails: timeouts and runtime errors become a [`TurnOutcome`]
    /// carrying the fixed user-facing message.
    pub async fn run_turn(&self, session_id: &str, input: &str) -> TurnOutcome {
        let outcome =
            match tokio::time::timeout(self.turn_timeout, self.process(session_id, input)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!(error = %e, "turn failed");
                    TurnOutcome::Failed {
                        message: failure_message(&e),
                    }
                }
                Err(_) => {
                    warn!(timeout = ?self.turn_timeout, "turn timed out");
                    TurnOutcome::TimedOut {
                        message: TIMEOUT_MESSAGE.to_string(),
                    }
                }
            };

        if let Err(e) = self
            .store
            .append(session_id, &Turn::now(input, outcome.message()))
        {
            warn!(error = %e, session = session_id, "failed to record turn");
        }
        outcome
    }

    async fn process(&self, session_id: &str, input: &str) -> Result<TurnOutcome, AgentError> {
        let history = self.recent_history(session_id);
        let (dispatch, _) = self.query_agent.classify(&history, input).await?;
        match dispatch {
            Dispatch::Reply(message) => Ok(TurnOutcome::Reply { message }),
            Dispatch::Delegate {
                target: DelegateTarget::Orchestrator,
                query,
            } => {
                info!(%query, "delegating to orchestrator");
                let report = self.orchestrator.research(&query).await?;
                Ok(TurnOutcome::Research(report))
            }
        }
    }

    /// Last `history_turns` turns as alternating user/assistant messages.
    fn recent_history(&self, session_id: &str) -> Vec<ChatMessage> {
        let turns = match self.store.get_history(session_id) {
            Ok(turns) => turns,
            Err(e) => {
                warn!(error = %e, session = session_id, "failed to read history");
                return Vec::new();
            }
        };
        let skip = turns.len().saturating_sub(self.history_turns);
        turns[skip..]
            .iter()
            .flat_map(|t| [user_message(&t.input), assistant_message(&t.output)])
            .collect()
    }

    /// Full history of a session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store cannot be read.
    pub fn history(&self, session_id: &str) -> Result<Vec<Turn>, StorageError> {
        self.store.get_history(session_id)
    }

    /// Clears a session. Returns the number of turns removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the delete fails.
    pub fn clear_session(&self, session_id: &str) -> Result<usize, StorageError> {
        self.store.clear(session_id)
    }
}

impl std::fmt::Debug for TurnRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnRunner")
            .field("query_agent", &self.query_agent)
            .field("orchestrator", &self.orchestrator)
            .field("turn_timeout", &self.turn_timeout)
            .field("history_turns", &self.history_turns)
            .finish_non_exhaustive()
    }
}
