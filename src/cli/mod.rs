//! CLI layer for deepsearch-rs.
//!
//! Provides the command-line interface using clap: the interactive chat
//! loop, single-turn `ask`, and session maintenance commands.

pub mod commands;
pub mod output;
pub mod parser;
pub mod repl;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
