//! Photo store contract and SQLite implementation.
//!
//! # Responsibility
//! - Store, retrieve and delete captured image bytes under opaque names.
//!
//! # Invariants
//! - Names match `[A-Za-z0-9_.-]+`; anything else is rejected before SQL.
//! - Storing under an existing name replaces the previous image.
//! - Deleting a missing name is not an error.

use crate::repo::kv_repo::{RepoError, RepoResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};

static PHOTO_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid photo name regex"));

/// Image persistence keyed by photo name.
pub trait PhotoStore {
    fn store(&self, name: &str, data: &[u8]) -> RepoResult<()>;
    fn retrieve(&self, name: &str) -> RepoResult<Option<Vec<u8>>>;
    fn delete(&self, name: &str) -> RepoResult<()>;
    /// Stored photo names in ascending order.
    fn list_names(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed photo store over the `photos` table.
#[derive(Clone, Copy)]
pub struct SqlitePhotoStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePhotoStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PhotoStore for SqlitePhotoStore<'_> {
    fn store(&self, name: &str, data: &[u8]) -> RepoResult<()> {
        validate_photo_name(name)?;
        self.conn.execute(
            "INSERT INTO photos (name, data)
             VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data;",
            params![name, data],
        )?;
        info!(
            "event=photo_store module=repo status=ok name={} bytes={}",
            name,
            data.len()
        );
        Ok(())
    }

    fn retrieve(&self, name: &str) -> RepoResult<Option<Vec<u8>>> {
        validate_photo_name(name)?;
        let data = self
            .conn
            .query_row("SELECT data FROM photos WHERE name = ?1;", [name], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(data)
    }

    fn delete(&self, name: &str) -> RepoResult<()> {
        validate_photo_name(name)?;
        self.conn
            .execute("DELETE FROM photos WHERE name = ?1;", [name])?;
        Ok(())
    }

    fn list_names(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM photos ORDER BY name ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

/// Rejects names that are empty or contain path-like characters.
pub fn validate_photo_name(name: &str) -> RepoResult<()> {
    if PHOTO_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(RepoError::InvalidKey(name.to_string()))
    }
}
