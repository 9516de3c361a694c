//! Inspection use-case service.
//!
//! # Responsibility
//! - Import/export detail rows and their annotations; create rows by hand.
//! - Open, save and bulk-clear inspections, stamped by the simulated clock.
//! - Produce date summaries and resolved judgment partitions.
//!
//! # Invariants
//! - Saving keeps the first `created_at` and moves `updated_at` to simulated now.
//! - Importing replaces detail rows only; inspections are kept.
//! - Summaries list ids in the order records were added, so equal-timestamp
//!   ties resolve `row_2` before `row_10`.
//! - Clearing removes detail rows and inspections; time settings and photos stay.

use crate::clock::{simulated_date, SimulatedClock, WallClock};
use crate::model::inspection::InspectionRecord;
use crate::model::record::{compare_record_ids, created_id, DetailRecord};
use crate::repo::record_repo::{InspectionMap, RecordRepository};
use crate::repo::KeyValueStore;
use crate::search::records::{search_records, SearchScope};
use crate::service::error::{ServiceError, ServiceResult};
use crate::summary::{
    find_summary, resolve_summary, summarize, DateSummary, JudgmentBucket, ResolvedPartition,
};
use crate::tabular::{build_spreadsheet, parse_spreadsheet, SpreadsheetFormat};
use log::{info, warn};

/// Inspection workflow facade over the record store and a simulated clock.
pub struct InspectionService<'clock, S: KeyValueStore, W: WallClock> {
    records: RecordRepository<S>,
    clock: &'clock SimulatedClock<W>,
}

impl<'clock, S: KeyValueStore, W: WallClock> InspectionService<'clock, S, W> {
    pub fn new(store: S, clock: &'clock SimulatedClock<W>) -> Self {
        Self {
            records: RecordRepository::new(store),
            clock,
        }
    }

    /// Parses spreadsheet bytes and replaces the stored detail rows.
    ///
    /// Returns the number of imported rows.
    pub fn import_records(&self, bytes: &[u8]) -> ServiceResult<usize> {
        let details = parse_spreadsheet(bytes)?;
        self.records.save_details(&details)?;
        info!(
            "event=records_import module=service status=ok rows={}",
            details.len()
        );
        Ok(details.len())
    }

    /// Appends a manually entered detail row and returns it.
    ///
    /// The id is `new_<millis>` of the simulated instant, moved forward past
    /// any id already taken. Column names are trimmed.
    ///
    /// # Errors
    /// - `EmptyRecord` when every value is blank.
    pub fn create_record(&self, fields: Vec<(String, String)>) -> ServiceResult<DetailRecord> {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(column, value)| (column.trim().to_string(), value))
            .collect();
        let mut details = self.records.load_details()?;

        let mut stamp = self.clock.now().timestamp_millis();
        while details.iter().any(|detail| detail.id == created_id(stamp)) {
            stamp += 1;
        }
        let record = DetailRecord::created(stamp, fields);
        if record.is_blank() {
            return Err(ServiceError::EmptyRecord);
        }

        details.push(record.clone());
        self.records.save_details(&details)?;
        info!(
            "event=record_create module=service status=ok id={} columns={}",
            record.id,
            record.fields.len()
        );
        Ok(record)
    }

    /// All detail rows in import order.
    pub fn list_records(&self) -> ServiceResult<Vec<DetailRecord>> {
        Ok(self.records.load_details()?)
    }

    /// Detail rows matching `term` within `scope`.
    pub fn search_records(
        &self,
        term: &str,
        scope: &SearchScope,
    ) -> ServiceResult<Vec<DetailRecord>> {
        let details = self.records.load_details()?;
        Ok(search_records(&details, term, scope)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the stored inspection for `id`, or a fresh draft.
    ///
    /// The draft is not persisted until `save_inspection`.
    ///
    /// # Errors
    /// - `RecordNotFound` when no detail row carries `id`.
    pub fn open_inspection(&self, id: &str) -> ServiceResult<InspectionRecord> {
        if self.records.find_detail(id)?.is_none() {
            return Err(ServiceError::RecordNotFound(id.to_string()));
        }
        if let Some(existing) = self.records.find_inspection(id)? {
            return Ok(existing);
        }
        let now = self.clock.now();
        Ok(InspectionRecord::draft(id, now, simulated_date(now)))
    }

    /// Validates and stores `inspection`, returning the persisted copy.
    pub fn save_inspection(
        &self,
        mut inspection: InspectionRecord,
    ) -> ServiceResult<InspectionRecord> {
        inspection.validate()?;

        let now = self.clock.now();
        let stored_created_at = self
            .records
            .find_inspection(&inspection.id)?
            .and_then(|stored| stored.created_at);
        inspection.created_at = stored_created_at.or(inspection.created_at).or(Some(now));
        inspection.updated_at = Some(now);

        self.records.upsert_inspection(&inspection)?;
        info!(
            "event=inspection_save module=service status=ok id={} has_outcome={} has_photo={}",
            inspection.id,
            inspection.inspection_result.is_some(),
            inspection.has_photo()
        );
        Ok(inspection)
    }

    /// All stored inspections keyed by id.
    pub fn list_inspections(&self) -> ServiceResult<InspectionMap> {
        Ok(self.records.load_inspections()?)
    }

    /// Per-date summaries, most recent date first.
    pub fn summaries(&self) -> ServiceResult<Vec<DateSummary>> {
        let inspections = self.records.load_inspections()?;
        Ok(summarize(in_record_order(&inspections)))
    }

    /// Resolves one judgment partition of the summary for `date`.
    ///
    /// An unknown date yields an empty partition.
    pub fn resolve(&self, date: &str, bucket: JudgmentBucket) -> ServiceResult<ResolvedPartition> {
        let details = self.records.load_details()?;
        let inspections = self.records.load_inspections()?;
        let summaries = summarize(in_record_order(&inspections));

        let Some(summary) = find_summary(&summaries, date) else {
            return Ok(ResolvedPartition::default());
        };
        let resolved = resolve_summary(summary, bucket, &details, &inspections);
        if resolved.dropped > 0 {
            warn!(
                "event=partition_resolve module=service status=degraded date={} dropped={}",
                date, resolved.dropped
            );
        }
        Ok(resolved)
    }

    /// Builds the combined spreadsheet export in `format`.
    pub fn export_records(&self, format: SpreadsheetFormat) -> ServiceResult<Vec<u8>> {
        let details = self.records.load_details()?;
        let inspections = self.records.load_inspections()?;
        Ok(build_spreadsheet(&details, &inspections, format)?)
    }

    /// Removes all detail rows and inspections.
    pub fn clear_all(&self) -> ServiceResult<()> {
        self.records.clear()?;
        info!("event=records_clear module=service status=ok");
        Ok(())
    }
}

fn in_record_order(inspections: &InspectionMap) -> Vec<&InspectionRecord> {
    let mut ordered: Vec<&InspectionRecord> = inspections.values().collect();
    ordered.sort_by(|left, right| compare_record_ids(&left.id, &right.id));
    ordered
}
