//! Web search: backend abstraction plus the retrying [`SearchTool`].
//!
//! ```text
//! DataGather ─► SearchTool (3 attempts, 10s each, 1s backoff)
//!                  └─► SearchBackend (Tavily over HTTPS)
//!                  └─► fallback_results() on exhaustion
//! ```

pub mod backend;
pub mod tool;

pub use backend::{SearchBackend, SearchHit, SearchResultSet, TavilyBackend};
pub use tool::{SearchOutcome, SearchPolicy, SearchTool, fallback_results};
