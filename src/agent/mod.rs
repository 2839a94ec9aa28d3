//! Multi-agent research system.
//!
//! A front-line [`QueryAgent`] classifies each turn. Research requests are
//! handed off to the [`Orchestrator`], which calls sub-agents exposed as
//! tools and synthesizes one answer. Providers are pluggable behind
//! [`LlmProvider`], backed by OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User turn → TurnRunner (timeout, session history)
//!   └── QueryAgent ── greeting / ambiguous → Reply
//!         └── research → Delegate → Orchestrator
//!               ├── create_plan       (PlanningAgent)
//!               ├── data_gather       (DataGatherAgent → SearchTool, ≤3 searches)
//!               ├── source_check      (SourceCheckerAgent)
//!               ├── reflect_data      (ReflectionAgent)
//!               ├── format_citations  (CitationAgent)
//!               ├── gaps? one more gather..cite cycle
//!               └── SynthesizerAgent → final response
//! ```

pub mod adapter;
pub mod artifact;
pub mod citation;
pub mod client;
pub mod config;
pub mod executor;
pub mod gather;
pub mod message;
pub mod orchestrator;
pub mod planning;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod query;
pub mod reflection;
pub mod runner;
pub mod source_check;
pub mod synthesizer;
pub mod tool;
pub mod traits;

// Re-export key types
pub use adapter::AgentTool;
pub use artifact::{Plan, RatedSource, Reflection, ResearchOutcome, ResearchReport};
pub use citation::CitationAgent;
pub use config::AgentConfig;
pub use executor::ToolExecutor;
pub use gather::DataGatherAgent;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::Orchestrator;
pub use planning::PlanningAgent;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use query::{DelegateTarget, Dispatch, QueryAgent, QueryMode};
pub use reflection::ReflectionAgent;
pub use runner::{TurnOutcome, TurnRunner};
pub use source_check::SourceCheckerAgent;
pub use synthesizer::SynthesizerAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse, SubAgent};
