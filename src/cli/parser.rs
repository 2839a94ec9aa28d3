//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Default session id.
pub const DEFAULT_SESSION: &str = "default";

/// deepsearch-rs: multi-agent deep research assistant.
///
/// Classifies each message, researches the web when needed and answers
/// with cited sources.
#[derive(Parser, Debug)]
#[command(name = "deepsearch-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the session database file.
    ///
    /// Defaults to `.deepsearch/sessions.db` in the current directory.
    #[arg(short, long, global = true, env = "DEEPSEARCH_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Session id for conversation history.
    #[arg(short, long, global = true, env = "DEEPSEARCH_SESSION", default_value = DEFAULT_SESSION)]
    pub session: String,

    /// Directory containing prompt template files.
    #[arg(long, global = true, env = "DEEPSEARCH_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute. Defaults to `chat`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive research chat.
    #[command(after_help = r#"Examples:
  deepsearch-rs                         # Chat in the default session
  deepsearch-rs --session cars chat     # Chat in a named session
"#)]
    Chat,

    /// Run a single turn and print the response.
    #[command(after_help = r#"Examples:
  deepsearch-rs ask "Compare electric and gas cars on running costs"
  deepsearch-rs --format json ask "EV battery lifespan" | jq '.citations'
"#)]
    Ask {
        /// The message to send.
        query: String,
    },

    /// Show the conversation history of a session.
    History {
        /// Show only the last N turns.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// List sessions with their turn counts.
    Sessions,

    /// Delete the conversation history of a session.
    Clear,

    /// Write default prompt templates to a directory.
    ///
    /// Existing files are not overwritten.
    InitPrompts {
        /// Target directory (defaults to `~/.config/deepsearch-rs/prompts`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }

    /// Returns the subcommand, defaulting to [`Commands::Chat`].
    #[must_use]
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }

    /// Log filter directive for the verbosity flag.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
