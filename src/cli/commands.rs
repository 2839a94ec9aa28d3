//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::client::{create_provider, create_search_backend};
use crate::agent::config::AgentConfig;
use crate::agent::prompt::PromptSet;
use crate::agent::runner::TurnRunner;
use crate::cli::output::{OutputFormat, format_history};
use crate::cli::parser::{Cli, Commands};
use crate::cli::repl::run_chat;
use crate::error::{CommandError, Result};
use crate::storage::{SessionStore, SqliteSessionStore};

/// Executes the CLI command.
///
/// # Returns
///
/// Result with output string on success. The chat loop writes to stdout
/// itself and returns an empty string.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or the command fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match cli.command() {
        Commands::Chat => cmd_chat(cli, &db_path),
        Commands::Ask { query } => cmd_ask(cli, &db_path, &query, format),
        Commands::History { limit } => cmd_history(&db_path, &cli.session, limit, format),
        Commands::Sessions => cmd_sessions(&db_path, format),
        Commands::Clear => cmd_clear(&db_path, &cli.session, format),
        Commands::InitPrompts { dir } => {
            cmd_init_prompts(dir.as_deref().or(cli.prompt_dir.as_deref()), format)
        }
    }
}

/// Opens the session store.
fn open_storage(db_path: &Path) -> Result<SqliteSessionStore> {
    Ok(SqliteSessionStore::open(db_path)?)
}

/// Builds a turn runner from environment configuration.
///
/// Missing API keys fail here, before any turn runs.
fn build_runner(cli: &Cli, db_path: &Path) -> Result<TurnRunner> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}"))
    })?;

    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let search = create_search_backend(&config);
    let store: Arc<dyn SessionStore> = Arc::new(open_storage(db_path)?);

    Ok(TurnRunner::new(provider, search, store, &config))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn cmd_chat(cli: &Cli, db_path: &Path) -> Result<String> {
    let runner = build_runner(cli, db_path)?;
    let rt = runtime()?;

    rt.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        run_chat(&runner, &cli.session, stdin, &mut stdout).await
    })?;

    Ok(String::new())
}

fn cmd_ask(cli: &Cli, db_path: &Path, query: &str, format: OutputFormat) -> Result<String> {
    let runner = build_runner(cli, db_path)?;
    let rt = runtime()?;

    let outcome = rt.block_on(runner.run_turn(&cli.session, query));

    match format {
        OutputFormat::Text => Ok(format!("{}\n", outcome.message())),
        OutputFormat::Json => serde_json::to_string_pretty(&outcome).map_err(|e| {
            CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()
        }),
    }
}

fn cmd_history(
    db_path: &Path,
    session: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<String> {
    let store = open_storage(db_path)?;
    let turns = store.get_history(session)?;
    let skip = limit.map_or(0, |n| turns.len().saturating_sub(n));
    Ok(format_history(session, &turns[skip..], format))
}

fn cmd_sessions(db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let sessions = store.list_sessions()?;

    match format {
        OutputFormat::Text => {
            if sessions.is_empty() {
                return Ok("No sessions.\n".to_string());
            }
            let mut output = String::new();
            for (id, turns) in &sessions {
                output.push_str(&format!("{id}\t{turns} turn(s)\n"));
            }
            Ok(output)
        }
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = sessions
                .iter()
                .map(|(id, turns)| serde_json::json!({ "session": id, "turns": turns }))
                .collect();
            Ok(format.to_json(&json))
        }
    }
}

fn cmd_clear(db_path: &Path, session: &str, format: OutputFormat) -> Result<String> {
    let store = open_storage(db_path)?;
    let removed = store.clear(session)?;

    match format {
        OutputFormat::Text => Ok(format!(
            "Cleared {removed} turn(s) from session '{session}'.\n"
        )),
        OutputFormat::Json => Ok(format.to_json(&serde_json::json!({
            "session": session,
            "removed": removed,
        }))),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::Turn;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let db_path = temp_dir.path().join("sessions.db");
        (temp_dir, db_path)
    }

    fn seed(db_path: &Path, session: &str, n: usize) {
        let store = open_storage(db_path).unwrap_or_else(|e| panic!("{e}"));
        for i in 0..n {
            store
                .append(session, &Turn::now(format!("q{i}"), format!("a{i}")))
                .unwrap_or_else(|e| panic!("{e}"));
        }
    }

    #[test]
    fn test_cmd_history_limit() {
        let (_dir, db_path) = setup();
        seed(&db_path, "s", 3);
        let out = cmd_history(&db_path, "s", Some(1), OutputFormat::Text)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(out.contains("You: q2"));
        assert!(!out.contains("You: q1"));
    }

    #[test]
    fn test_cmd_clear_reports_count() {
        let (_dir, db_path) = setup();
        seed(&db_path, "s", 2);
        let out = cmd_clear(&db_path, "s", OutputFormat::Text).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out, "Cleared 2 turn(s) from session 's'.\n");
        let out = cmd_history(&db_path, "s", None, OutputFormat::Text)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(out.contains("No history"));
    }

    #[test]
    fn test_cmd_sessions_json() {
        let (_dir, db_path) = setup();
        seed(&db_path, "a", 1);
        seed(&db_path, "b", 2);
        let out = cmd_sessions(&db_path, OutputFormat::Json).unwrap_or_else(|e| panic!("{e}"));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_cmd_init_prompts_writes_once() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let out = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(out.starts_with("Wrote 4 prompt template(s)"));
        let out = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(out.starts_with("All prompt templates already exist"));
    }
}
