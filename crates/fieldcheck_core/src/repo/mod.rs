//! Repository layer over the key-value and photo stores.
//!
//! # Responsibility
//! - Define the key-value and photo store contracts.
//! - Map typed documents (settings, detail rows, inspections) onto store entries.
//!
//! # Invariants
//! - Each collection lives under exactly one key and is written as one JSON document.
//! - Corrupt persisted documents surface as `RepoError::Serialization`, never as
//!   silently empty collections.

pub mod kv_repo;
pub mod photo_repo;
pub mod record_repo;
pub mod settings_repo;

pub use kv_repo::{KeyValueStore, RepoError, RepoResult, SqliteKeyValueStore};
