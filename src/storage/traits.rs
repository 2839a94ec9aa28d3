//! Session store trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// One completed exchange: what the user typed and what was shown back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// User input.
    pub input: String,
    /// Text shown to the user.
    pub output: String,
    /// When the turn was recorded.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Creates a turn stamped with the current time.
    #[must_use]
    pub fn now(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            created_at: Utc::now(),
        }
    }
}

/// Storage for per-session conversation history.
///
/// A session is created implicitly by its first [`append`](Self::append)
/// and removed by [`clear`](Self::clear). Turns are returned in insertion
/// order. Callers guarantee a single writer per session id.
pub trait SessionStore: Send + Sync {
    /// Returns every turn of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing store cannot be read.
    fn get_history(&self, session_id: &str) -> Result<Vec<Turn>, StorageError>;

    /// Appends one turn to a session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the turn cannot be written.
    fn append(&self, session_id: &str, turn: &Turn) -> Result<(), StorageError>;

    /// Deletes all turns of a session. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the delete fails.
    fn clear(&self, session_id: &str) -> Result<usize, StorageError>;
}
