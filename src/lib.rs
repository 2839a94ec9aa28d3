//! deepsearch-rs: multi-agent deep research assistant.
//!
//! A query agent classifies each chat turn. Research questions are
//! delegated to an orchestrator that plans, gathers web data, rates
//! sources, reflects on gaps (recycling at most once), formats APA
//! citations and synthesizes a single answer.
//!
//! # Layers
//!
//! - [`agent`]: query agent, orchestrator, research sub-agents, providers
//! - [`search`]: web search backend and the retrying search tool
//! - [`storage`]: per-session conversation history
//! - [`cli`]: chat loop and commands
//! - [`crate::core`]: shared domain types
//! - [`error`]: error types for every layer

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod search;
pub mod storage;

pub use agent::{
    AgentConfig, Dispatch, Orchestrator, QueryAgent, ResearchReport, TurnOutcome, TurnRunner,
};
pub use error::{AgentError, Error, Result};
