//! Persistence for imported detail rows and their inspections.
//!
//! # Responsibility
//! - Store the detail row collection and the id -> inspection mapping as two
//!   independent documents.
//! - Provide single-inspection upsert and bulk clear.
//!
//! # Invariants
//! - The two collections are independently mutable; an inspection may refer to
//!   a detail row that no longer exists (and vice versa).
//! - The inspection mapping is keyed by the record's own `id`.

use crate::model::inspection::InspectionRecord;
use crate::model::record::{DetailRecord, RecordId};
use crate::repo::kv_repo::{get_json, set_json, KeyValueStore, RepoError, RepoResult};
use log::info;
use std::collections::BTreeMap;

/// Store key holding the imported detail rows.
pub const DETAIL_RECORDS_KEY: &str = "detailRecords";
/// Store key holding the id -> inspection mapping.
pub const INSPECTIONS_KEY: &str = "inspectionRecords";

/// Inspection collection keyed by record id.
pub type InspectionMap = BTreeMap<RecordId, InspectionRecord>;

/// Typed access to the record collections.
pub struct RecordRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> RecordRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns all detail rows in import order; empty when none were imported.
    pub fn load_details(&self) -> RepoResult<Vec<DetailRecord>> {
        Ok(get_json(&self.store, DETAIL_RECORDS_KEY)?.unwrap_or_default())
    }

    /// Replaces the whole detail row collection.
    pub fn save_details(&self, details: &[DetailRecord]) -> RepoResult<()> {
        set_json(&self.store, DETAIL_RECORDS_KEY, details)?;
        info!(
            "event=details_save module=repo status=ok count={}",
            details.len()
        );
        Ok(())
    }

    /// Returns one detail row by id.
    pub fn find_detail(&self, id: &str) -> RepoResult<Option<DetailRecord>> {
        Ok(self
            .load_details()?
            .into_iter()
            .find(|detail| detail.id == id))
    }

    /// Returns the inspection mapping; empty when nothing was saved.
    pub fn load_inspections(&self) -> RepoResult<InspectionMap> {
        let map: InspectionMap = get_json(&self.store, INSPECTIONS_KEY)?.unwrap_or_default();
        if let Some((key, record)) = map.iter().find(|(key, record)| **key != record.id) {
            return Err(RepoError::InvalidData(format!(
                "inspection stored under `{key}` carries id `{}`",
                record.id
            )));
        }
        Ok(map)
    }

    /// Replaces the whole inspection mapping.
    pub fn save_inspections(&self, inspections: &InspectionMap) -> RepoResult<()> {
        set_json(&self.store, INSPECTIONS_KEY, inspections)
    }

    /// Returns one inspection by id.
    pub fn find_inspection(&self, id: &str) -> RepoResult<Option<InspectionRecord>> {
        Ok(self.load_inspections()?.remove(id))
    }

    /// Inserts or replaces one inspection, keyed by its id.
    pub fn upsert_inspection(&self, inspection: &InspectionRecord) -> RepoResult<()> {
        let mut all = self.load_inspections()?;
        all.insert(inspection.id.clone(), inspection.clone());
        self.save_inspections(&all)
    }

    /// Removes both record collections at once.
    pub fn clear(&self) -> RepoResult<()> {
        self.store
            .clear_group(&[DETAIL_RECORDS_KEY, INSPECTIONS_KEY])
    }
}
