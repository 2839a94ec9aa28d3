//! Output formatting for CLI commands.

use serde::Serialize;

use crate::storage::Turn;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as JSON, or an error object if that fails.
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

/// Renders a session history.
#[must_use]
pub fn format_history(session: &str, turns: &[Turn], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if turns.is_empty() {
                return format!("No history for session '{session}'.\n");
            }
            let mut out = String::new();
            for turn in turns {
                out.push_str(&format!(
                    "[{}]\nYou: {}\nAgent: {}\n\n",
                    turn.created_at.to_rfc3339(),
                    turn.input,
                    turn.output
                ));
            }
            out
        }
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "session": session,
            "turns": turns,
        })),
    }
}
