//! Date-grouped inspection aggregation.
//!
//! # Responsibility
//! - Group summarizable inspections by effective date and count outcomes.
//! - Partition each date's record ids by judgment.
//! - Join a selected partition back to detail rows in annotation order.
//!
//! # Invariants
//! - Every record with an outcome and a non-empty date lands in exactly one
//!   summary and exactly one of its two partitions.
//! - Summaries are ordered by date, most recent first.
//! - Dangling ids are dropped from resolved partitions and counted, never raised.

use crate::model::inspection::{
    parse_effective_date, InspectionOutcome, InspectionRecord, Judgment,
};
use crate::model::record::{DetailRecord, RecordId};
use log::debug;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Judgment partition a record is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgmentBucket {
    Yes,
    No,
}

impl JudgmentBucket {
    /// Default classification rule.
    ///
    /// Only an explicit `Yes` is classified as `Yes`. An unset judgment is
    /// classified as `No`, so it still shows up in the per-date listing.
    pub fn classify(judgment: Option<Judgment>) -> Self {
        match judgment {
            Some(Judgment::Yes) => Self::Yes,
            Some(Judgment::No) | None => Self::No,
        }
    }

    /// Parses `yes`/`no` case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            _ => None,
        }
    }
}

/// Per-date outcome counters, counted regardless of judgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub fit: u32,
    pub unfit: u32,
    pub absent_closed: u32,
    pub other: u32,
}

impl OutcomeCounts {
    pub fn get(&self, outcome: InspectionOutcome) -> u32 {
        match outcome {
            InspectionOutcome::Fit => self.fit,
            InspectionOutcome::Unfit => self.unfit,
            InspectionOutcome::AbsentClosed => self.absent_closed,
            InspectionOutcome::Other => self.other,
        }
    }

    fn increment(&mut self, outcome: InspectionOutcome) {
        let slot = match outcome {
            InspectionOutcome::Fit => &mut self.fit,
            InspectionOutcome::Unfit => &mut self.unfit,
            InspectionOutcome::AbsentClosed => &mut self.absent_closed,
            InspectionOutcome::Other => &mut self.other,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.fit + self.unfit + self.absent_closed + self.other
    }
}

/// Aggregated view of one effective date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSummary {
    pub date: String,
    pub counts: OutcomeCounts,
    /// Ids judged `Yes`, in input order.
    pub yes_items: Vec<RecordId>,
    /// Ids judged `No` or unset, in input order.
    pub no_items: Vec<RecordId>,
}

impl DateSummary {
    fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            counts: OutcomeCounts::default(),
            yes_items: Vec::new(),
            no_items: Vec::new(),
        }
    }

    /// Ids in the given judgment partition.
    pub fn partition(&self, bucket: JudgmentBucket) -> &[RecordId] {
        match bucket {
            JudgmentBucket::Yes => &self.yes_items,
            JudgmentBucket::No => &self.no_items,
        }
    }

    /// Number of records listed across both partitions.
    pub fn total(&self) -> usize {
        self.yes_items.len() + self.no_items.len()
    }
}

/// Groups inspections into per-date summaries, most recent date first.
pub fn summarize<'a, I>(records: I) -> Vec<DateSummary>
where
    I: IntoIterator<Item = &'a InspectionRecord>,
{
    let mut summaries: Vec<DateSummary> = Vec::new();
    let mut index_by_date: HashMap<&'a str, usize> = HashMap::new();

    for record in records {
        let Some(outcome) = record.summarized_outcome() else {
            continue;
        };

        let slot = *index_by_date
            .entry(record.date.as_str())
            .or_insert_with(|| {
                summaries.push(DateSummary::new(&record.date));
                summaries.len() - 1
            });
        let summary = &mut summaries[slot];

        summary.counts.increment(outcome);
        match JudgmentBucket::classify(record.judgment) {
            JudgmentBucket::Yes => summary.yes_items.push(record.id.clone()),
            JudgmentBucket::No => summary.no_items.push(record.id.clone()),
        }
    }

    summaries.sort_by(|left, right| compare_dates_desc(&left.date, &right.date));
    summaries
}

/// Finds the summary for `date` by exact key match.
pub fn find_summary<'a>(summaries: &'a [DateSummary], date: &str) -> Option<&'a DateSummary> {
    summaries.iter().find(|summary| summary.date == date)
}

// Calendar dates first (newest first), then unparseable keys by text.
fn compare_dates_desc(left: &str, right: &str) -> Ordering {
    match (parse_effective_date(left), parse_effective_date(right)) {
        (Some(l), Some(r)) => r.cmp(&l).then_with(|| right.cmp(left)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => right.cmp(left),
    }
}

/// One record of a resolved partition joined with its detail row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub detail: DetailRecord,
    pub inspection: InspectionRecord,
}

/// Resolved partition plus the number of ids that could not be joined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPartition {
    pub entries: Vec<ResolvedEntry>,
    pub dropped: usize,
}

/// Joins `ids` to detail rows and inspections, oldest activity first.
///
/// Ids without a detail row or inspection are skipped and counted in
/// `dropped`. Ordering uses `updated_at`, falling back to `created_at`;
/// records with neither sort first. Equal keys keep the order of `ids`.
pub fn resolve_partition(
    ids: &[RecordId],
    details: &[DetailRecord],
    inspections: &BTreeMap<RecordId, InspectionRecord>,
) -> ResolvedPartition {
    let details_by_id: HashMap<&str, &DetailRecord> = details
        .iter()
        .map(|detail| (detail.id.as_str(), detail))
        .collect();

    let mut entries = Vec::with_capacity(ids.len());
    let mut dropped = 0;
    for id in ids {
        match (details_by_id.get(id.as_str()), inspections.get(id)) {
            (Some(detail), Some(inspection)) => entries.push(ResolvedEntry {
                detail: (*detail).clone(),
                inspection: inspection.clone(),
            }),
            _ => dropped += 1,
        }
    }

    // `sort_by_key` is stable.
    entries.sort_by_key(|entry| entry.inspection.activity_instant());

    debug!(
        "event=partition_resolve module=summary status=ok requested={} kept={} dropped={}",
        ids.len(),
        entries.len(),
        dropped
    );

    ResolvedPartition { entries, dropped }
}

/// Resolves the `bucket` partition of `summary`.
pub fn resolve_summary(
    summary: &DateSummary,
    bucket: JudgmentBucket,
    details: &[DetailRecord],
    inspections: &BTreeMap<RecordId, InspectionRecord>,
) -> ResolvedPartition {
    resolve_partition(summary.partition(bucket), details, inspections)
}
