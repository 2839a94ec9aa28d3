//! Error types for deepsearch-rs.
//!
//! Each layer owns a `thiserror` enum; [`Error`] unifies them for the CLI.
//! Only configuration errors are allowed to escape a chat turn; everything
//! else is converted to a user-visible message by the turn runner.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent, provider, or orchestration failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Session store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure (terminal, prompt files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by agents, providers and the orchestrator.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No LLM API key was configured.
    #[error(
        "LLM API key missing: set DEEPSEARCH_API_KEY, OPENAI_API_KEY or GEMINI_API_KEY"
    )]
    ApiKeyMissing,

    /// No search backend API key was configured.
    #[error("search API key missing: set TAVILY_API_KEY")]
    SearchKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// The provider rejected or failed a request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error text.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The model returned content that could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw model output.
        content: String,
    },

    /// A tool call could not be executed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// The research pipeline could not proceed.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Failure detail.
        message: String,
    },
}

/// Errors from a search backend. Recovered inside
/// [`SearchTool`](crate::search::SearchTool) and never surfaced to users.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport-level failure.
    #[error("search request failed: {0}")]
    Http(String),

    /// Backend answered with a non-success status.
    #[error("search backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Backend answered with an unexpected payload.
    #[error("invalid search response: {0}")]
    Decode(String),

    /// A single attempt exceeded its deadline.
    #[error("search attempt timed out after {secs}s")]
    Timeout {
        /// Configured per-attempt timeout.
        secs: u64,
    },
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("session store lock poisoned")]
    LockPoisoned,

    /// The database directory could not be created.
    #[error("failed to prepare database path {path}: {message}")]
    Path {
        /// Offending path.
        path: String,
        /// Failure detail.
        message: String,
    },
}

/// Errors from CLI command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not be completed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}
