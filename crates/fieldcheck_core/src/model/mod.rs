//! Domain model for imported records and their inspections.
//!
//! # Responsibility
//! - Define the persisted shapes for detail rows, inspections and the time anchor.
//! - Keep serde layouts stable for the key-value documents.
//!
//! # Invariants
//! - Detail records and inspections share the same stable `RecordId`.
//! - Inspections are never deleted individually; only bulk-cleared.

pub mod inspection;
pub mod record;
pub mod settings;
