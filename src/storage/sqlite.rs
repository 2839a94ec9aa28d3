//! SQLite-backed session store.
//!
//! A single connection guarded by a mutex. The chat loop is the only
//! writer per session, so contention is never more than one turn deep.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use tracing::debug;

use super::traits::{SessionStore, Turn};
use crate::error::StorageError;

/// Default database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".deepsearch/sessions.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS turns (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL,
    input       TEXT NOT NULL,
    output      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns(session_id, id);
";

/// Session store persisted in a SQLite file.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory or database cannot be
    /// created or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Path {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Lists session ids with their turn counts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails.
    pub fn list_sessions(&self) -> Result<Vec<(String, usize)>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT session_id, COUNT(*) FROM turns GROUP BY session_id ORDER BY session_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((id, usize::try_from(count).unwrap_or(0)))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl std::fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSessionStore").finish_non_exhaustive()
    }
}

impl SessionStore for SqliteSessionStore {
    fn get_history(&self, session_id: &str) -> Result<Vec<Turn>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT input, output, created_at FROM turns WHERE session_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            let created: String = row.get(2)?;
            let created_at = DateTime::parse_from_rfc3339(&created)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?
                .with_timezone(&Utc);
            Ok(Turn {
                input: row.get(0)?,
                output: row.get(1)?,
                created_at,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn append(&self, session_id: &str, turn: &Turn) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO turns (session_id, input, output, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session_id,
                turn.input,
                turn.output,
                turn.created_at.to_rfc3339()
            ],
        )?;
        debug!(session_id, "turn appended");
        Ok(())
    }

    fn clear(&self, session_id: &str) -> Result<usize, StorageError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM turns WHERE session_id = ?1", params![session_id])?;
        debug!(session_id, removed, "session cleared");
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> SqliteSessionStore {
        SqliteSessionStore::in_memory().unwrap_or_else(|e| panic!("in_memory failed: {e}"))
    }

    #[test]
    fn test_append_and_history_order() {
        let store = store();
        store
            .append("s1", &Turn::now("hi", "hello"))
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .append("s1", &Turn::now("compare evs", "answer"))
            .unwrap_or_else(|e| panic!("{e}"));
        store
            .append("s2", &Turn::now("other", "x"))
            .unwrap_or_else(|e| panic!("{e}"));

        let history = store.get_history("s1").unwrap_or_default();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].input, "hi");
        assert_eq!(history[1].output, "answer");
    }

    #[test]
    fn test_unknown_session_is_empty() {
        assert!(store().get_history("nobody").unwrap_or_default().is_empty());
    }

    #[test]
    fn test_clear_only_affects_one_session() {
        let store = store();
        store.append("s1", &Turn::now("a", "b")).unwrap_or_else(|e| panic!("{e}"));
        store.append("s2", &Turn::now("c", "d")).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(store.clear("s1").unwrap_or_default(), 1);
        assert!(store.get_history("s1").unwrap_or_default().is_empty());
        assert_eq!(store.get_history("s2").unwrap_or_default().len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("nested").join("sessions.db");
        {
            let store = SqliteSessionStore::open(&path).unwrap_or_else(|e| panic!("{e}"));
            store.append("user", &Turn::now("q", "a")).unwrap_or_else(|e| panic!("{e}"));
        }
        let store = SqliteSessionStore::open(&path).unwrap_or_else(|e| panic!("{e}"));
        let history = store.get_history("user").unwrap_or_default();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].input, "q");
    }

    #[test]
    fn test_list_sessions() {
        let store = store();
        store.append("b", &Turn::now("1", "1")).unwrap_or_else(|e| panic!("{e}"));
        store.append("a", &Turn::now("1", "1")).unwrap_or_else(|e| panic!("{e}"));
        store.append("a", &Turn::now("2", "2")).unwrap_or_else(|e| panic!("{e}"));
        let sessions = store.list_sessions().unwrap_or_default();
        assert_eq!(sessions, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    }
}
