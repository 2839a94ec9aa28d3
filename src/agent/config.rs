//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! The resulting [`AgentConfig`] is built once at startup and passed by
//! reference to every component that needs it.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;
use crate::search::SearchPolicy;
use crate::search::tool::{
    DEFAULT_MAX_RESULTS, DEFAULT_SEARCH_ATTEMPTS, DEFAULT_SEARCH_BACKOFF, DEFAULT_SEARCH_TIMEOUT,
};

/// OpenAI-compatible endpoint for Gemini models.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
/// Default model when talking to the Gemini endpoint.
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
/// Default model for OpenAI-compatible endpoints.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
/// Default model for the lightweight classification step.
const DEFAULT_OPENAI_QUERY_MODEL: &str = "gpt-4o-mini";
/// Default greeting returned for salutations.
pub const DEFAULT_GREETING: &str = "Hi! How can I help with your research today?";
/// Default synthesizer max tokens.
const DEFAULT_SYNTHESIZER_MAX_TOKENS: u32 = 4096;
/// Default max tokens for planning, reflection and classification.
const DEFAULT_AGENT_MAX_TOKENS: u32 = 1024;
/// Default wall-clock budget for one chat turn.
const DEFAULT_TURN_TIMEOUT_SECS: u64 = 30;
/// Upper bound on extra research cycles per turn; also the default.
pub const MAX_RECYCLES: usize = 1;
/// Default number of past turns shown to the query agent.
const DEFAULT_HISTORY_TURNS: usize = 6;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// API key for the search backend.
    pub search_api_key: String,
    /// Model for the query (classification) agent.
    pub query_model: String,
    /// Model for the planning agent.
    pub planning_model: String,
    /// Model for the reflection agent.
    pub reflection_model: String,
    /// Model for the final synthesis.
    pub synthesizer_model: String,
    /// Maximum tokens for planning, reflection and classification responses.
    pub agent_max_tokens: u32,
    /// Maximum tokens for synthesizer responses.
    pub synthesizer_max_tokens: u32,
    /// Retry, timeout and sizing policy for web searches.
    pub search: SearchPolicy,
    /// Extra research cycles allowed per turn when gaps are found, at most
    /// [`MAX_RECYCLES`].
    pub max_recycles: usize,
    /// Wall-clock budget for one chat turn.
    pub turn_timeout: Duration,
    /// Number of recent turns given to the query agent as context.
    pub history_turns: usize,
    /// Fixed reply for greetings.
    pub greeting: String,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] or [`AgentError::SearchKeyMissing`]
    /// if either required key is absent.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    gemini_key: bool,
    base_url: Option<String>,
    search_api_key: Option<String>,
    query_model: Option<String>,
    planning_model: Option<String>,
    reflection_model: Option<String>,
    synthesizer_model: Option<String>,
    agent_max_tokens: Option<u32>,
    synthesizer_max_tokens: Option<u32>,
    search_attempts: Option<u32>,
    search_timeout: Option<Duration>,
    search_backoff: Option<Duration>,
    search_max_results: Option<usize>,
    max_recycles: Option<usize>,
    turn_timeout: Option<Duration>,
    history_turns: Option<usize>,
    greeting: Option<String>,
    prompt_dir: Option<PathBuf>,
}

/// Reads a non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses a positive whole number of seconds.
fn parse_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env_var("DEEPSEARCH_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = env_var("DEEPSEARCH_API_KEY").or_else(|| env_var("OPENAI_API_KEY"));
            if self.api_key.is_none() {
                self.api_key = env_var("GEMINI_API_KEY");
                self.gemini_key = self.api_key.is_some();
            }
        }
        if self.base_url.is_none() {
            self.base_url = env_var("DEEPSEARCH_BASE_URL").or_else(|| env_var("BASE_URL"));
        }
        if self.search_api_key.is_none() {
            self.search_api_key = env_var("TAVILY_API_KEY");
        }
        if self.query_model.is_none() {
            self.query_model = env_var("DEEPSEARCH_QUERY_MODEL");
        }
        if self.planning_model.is_none() {
            self.planning_model = env_var("DEEPSEARCH_PLANNING_MODEL");
        }
        if self.reflection_model.is_none() {
            self.reflection_model = env_var("DEEPSEARCH_REFLECTION_MODEL");
        }
        if self.synthesizer_model.is_none() {
            self.synthesizer_model = env_var("DEEPSEARCH_SYNTHESIZER_MODEL");
        }
        if self.turn_timeout.is_none() {
            self.turn_timeout = env_var("DEEPSEARCH_TURN_TIMEOUT").and_then(|v| parse_secs(&v));
        }
        if self.greeting.is_none() {
            self.greeting = env_var("DEEPSEARCH_GREETING");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_var("DEEPSEARCH_PROMPT_DIR").map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the LLM API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets a Gemini API key; the Gemini endpoint and models become the defaults.
    #[must_use]
    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self.gemini_key = true;
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the search backend API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets one model for every agent.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.query_model = Some(model.clone());
        self.planning_model = Some(model.clone());
        self.reflection_model = Some(model.clone());
        self.synthesizer_model = Some(model);
        self
    }

    /// Sets the query agent model.
    #[must_use]
    pub fn query_model(mut self, model: impl Into<String>) -> Self {
        self.query_model = Some(model.into());
        self
    }

    /// Sets the planning agent model.
    #[must_use]
    pub fn planning_model(mut self, model: impl Into<String>) -> Self {
        self.planning_model = Some(model.into());
        self
    }

    /// Sets the reflection agent model.
    #[must_use]
    pub fn reflection_model(mut self, model: impl Into<String>) -> Self {
        self.reflection_model = Some(model.into());
        self
    }

    /// Sets the synthesizer model.
    #[must_use]
    pub fn synthesizer_model(mut self, model: impl Into<String>) -> Self {
        self.synthesizer_model = Some(model.into());
        self
    }

    /// Sets max tokens for planning, reflection and classification.
    #[must_use]
    pub const fn agent_max_tokens(mut self, n: u32) -> Self {
        self.agent_max_tokens = Some(n);
        self
    }

    /// Sets the synthesizer max tokens.
    #[must_use]
    pub const fn synthesizer_max_tokens(mut self, n: u32) -> Self {
        self.synthesizer_max_tokens = Some(n);
        self
    }

    /// Sets the number of attempts per web search.
    #[must_use]
    pub const fn search_attempts(mut self, n: u32) -> Self {
        self.search_attempts = Some(n);
        self
    }

    /// Sets the per-attempt search timeout.
    #[must_use]
    pub const fn search_timeout(mut self, duration: Duration) -> Self {
        self.search_timeout = Some(duration);
        self
    }

    /// Sets the backoff between search attempts.
    #[must_use]
    pub const fn search_backoff(mut self, duration: Duration) -> Self {
        self.search_backoff = Some(duration);
        self
    }

    /// Sets the results requested per search.
    #[must_use]
    pub const fn search_max_results(mut self, n: usize) -> Self {
        self.search_max_results = Some(n);
        self
    }

    /// Sets the number of extra research cycles allowed per turn.
    ///
    /// Values above [`MAX_RECYCLES`] are clamped when the config is built.
    #[must_use]
    pub const fn max_recycles(mut self, n: usize) -> Self {
        self.max_recycles = Some(n);
        self
    }

    /// Sets the wall-clock budget for one chat turn. Zero means the default.
    #[must_use]
    pub const fn turn_timeout(mut self, duration: Duration) -> Self {
        self.turn_timeout = Some(duration);
        self
    }

    /// Sets how many past turns the query agent sees.
    #[must_use]
    pub const fn history_turns(mut self, n: usize) -> Self {
        self.history_turns = Some(n);
        self
    }

    /// Sets the fixed greeting reply.
    #[must_use]
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no LLM key was set and
    /// [`AgentError::SearchKeyMissing`] if no search key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;
        let search_api_key = self.search_api_key.ok_or(AgentError::SearchKeyMissing)?;

        let gemini = self.gemini_key && self.base_url.is_none();
        let base_url = if gemini {
            Some(GEMINI_BASE_URL.to_string())
        } else {
            self.base_url
        };
        let (main_model, light_model) = if gemini {
            (DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_MODEL)
        } else {
            (DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_QUERY_MODEL)
        };

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url,
            search_api_key,
            query_model: self.query_model.unwrap_or_else(|| light_model.to_string()),
            planning_model: self.planning_model.unwrap_or_else(|| main_model.to_string()),
            reflection_model: self
                .reflection_model
                .unwrap_or_else(|| main_model.to_string()),
            synthesizer_model: self
                .synthesizer_model
                .unwrap_or_else(|| main_model.to_string()),
            agent_max_tokens: self.agent_max_tokens.unwrap_or(DEFAULT_AGENT_MAX_TOKENS),
            synthesizer_max_tokens: self
                .synthesizer_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIZER_MAX_TOKENS),
            search: SearchPolicy {
                attempts: self.search_attempts.unwrap_or(DEFAULT_SEARCH_ATTEMPTS),
                timeout: self.search_timeout.unwrap_or(DEFAULT_SEARCH_TIMEOUT),
                backoff: self.search_backoff.unwrap_or(DEFAULT_SEARCH_BACKOFF),
                max_results: self.search_max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            },
            max_recycles: self.max_recycles.map_or(MAX_RECYCLES, |n| n.min(MAX_RECYCLES)),
            turn_timeout: self
                .turn_timeout
                .filter(|d| !d.is_zero())
                .unwrap_or(Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS)),
            history_turns: self.history_turns.unwrap_or(DEFAULT_HISTORY_TURNS),
            greeting: self
                .greeting
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
            prompt_dir: self.prompt_dir,
        })
    }
}
