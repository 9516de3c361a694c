//! SQLite bootstrap for the key-value and photo stores.
//!
//! # Responsibility
//! - Open file or in-memory connections with a busy timeout.
//! - Bring the schema up to date before any store touches the connection.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A failed schema step rolls back every step applied in the same open.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or migrate the database.
#[derive(Debug)]
pub enum DbError {
    /// Connection setup or version bookkeeping failed.
    Sqlite(rusqlite::Error),
    /// One schema step could not be applied.
    Migration {
        version: u32,
        step: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build; it is never downgraded.
    SchemaTooNew { stored: u32, latest: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Migration {
                version,
                step,
                source,
            } => write!(f, "schema step {version} ({step}) failed: {source}"),
            Self::SchemaTooNew { stored, latest } => write!(
                f,
                "database schema version {stored} is newer than this build supports ({latest})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
