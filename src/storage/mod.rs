//! Persistent conversation history keyed by session id.

pub mod sqlite;
pub mod traits;

pub use sqlite::{DEFAULT_DB_PATH, SqliteSessionStore};
pub use traits::{SessionStore, Turn};
