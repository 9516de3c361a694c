//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Flatten core errors into envelope messages the UI can show as-is.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every call opens its own connection; no connection outlives a call.
//! - Instants cross the boundary as display text, never as raw epochs.

use fieldcheck_core::clock::simulated_date;
use fieldcheck_core::db::open_db;
use fieldcheck_core::{
    core_version as core_version_inner, format_for_display, init_logging as init_logging_inner,
    ping as ping_inner, DateSummary, InspectionOutcome, InspectionService, Judgment,
    JudgmentBucket, ResolvedEntry, ServiceResult, SettingsService, SqliteKeyValueStore,
    SystemClock, WallClock,
};
use log::warn;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::OnceLock;

const ENTRY_DB_FILE_NAME: &str = "fieldcheck_entry.sqlite3";
const DB_PATH_ENV: &str = "FIELDCHECK_DB_PATH";
static ENTRY_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Record the action touched, when there is one.
    pub record_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, record_id: Option<String>) -> Self {
        Self {
            ok: true,
            record_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            record_id: None,
            message: message.into(),
        }
    }
}

/// Simulated clock reading for the header display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockReading {
    /// `YYYY. MM. DD. HH:mm:ss` in local time.
    pub display: String,
    /// Simulated local date, `YYYY-MM-DD`.
    pub date: String,
    /// `false` when the stored anchor is unusable and real time is shown.
    pub simulated: bool,
    pub message: String,
}

/// Marks the app start: stores the reference instant on first launch.
///
/// # FFI contract
/// - Idempotent; repeat calls keep the first reference instant.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn init_time_settings() -> EntryActionResponse {
    match with_settings_service(|service| service.ensure_reference_instant()) {
        Ok(true) => EntryActionResponse::success("Reference instant recorded.", None),
        Ok(false) => EntryActionResponse::success("Reference instant already set.", None),
        Err(err) => EntryActionResponse::failure(format!("init_time_settings failed: {err}")),
    }
}

/// Reads the simulated clock from freshly loaded settings.
///
/// Intended to be polled once per second by the UI timer.
#[flutter_rust_bridge::frb(sync)]
pub fn clock_now_display() -> ClockReading {
    match with_settings_service(|service| service.clock()) {
        Ok(clock) => {
            let simulated = clock.is_valid();
            let now = clock.now();
            ClockReading {
                display: format_for_display(now),
                date: simulated_date(now),
                simulated,
                message: if simulated {
                    String::new()
                } else {
                    "Time settings are invalid; showing real time.".to_string()
                },
            }
        }
        Err(err) => {
            let now = SystemClock.now();
            ClockReading {
                display: format_for_display(now),
                date: simulated_date(now),
                simulated: false,
                message: format!("clock_now_display failed: {err}"),
            }
        }
    }
}

/// Validates and stores a new anchor date (`YYYY-MM-DD`) and time (`HH:mm`).
#[flutter_rust_bridge::frb(sync)]
pub fn save_time_settings(anchor_date: String, anchor_time: String) -> EntryActionResponse {
    match with_settings_service(|service| service.save_anchor(&anchor_date, &anchor_time)) {
        Ok(anchor) => EntryActionResponse::success(
            format!(
                "Time settings saved: {} {}.",
                anchor.anchor_date, anchor.anchor_time
            ),
            None,
        ),
        Err(err) => EntryActionResponse::failure(format!("save_time_settings failed: {err}")),
    }
}

/// Import outcome envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    pub ok: bool,
    pub imported: u32,
    pub message: String,
}

/// Imports an `.xlsx` workbook or CSV file from `path`, replacing stored
/// detail rows. The format is detected from the file content.
///
/// Existing inspections are kept and re-attach by row id.
#[flutter_rust_bridge::frb(sync)]
pub fn import_records_from_file(path: String) -> ImportResponse {
    let bytes = match std::fs::read(path.trim()) {
        Ok(bytes) => bytes,
        Err(err) => {
            return ImportResponse {
                ok: false,
                imported: 0,
                message: format!("import_records_from_file failed: cannot read `{path}`: {err}"),
            };
        }
    };
    match with_inspection_service(|service| service.import_records(&bytes)) {
        Ok(count) => ImportResponse {
            ok: true,
            imported: u32::try_from(count).unwrap_or(u32::MAX),
            message: format!("Imported {count} row(s)."),
        },
        Err(err) => ImportResponse {
            ok: false,
            imported: 0,
            message: format!("import_records_from_file failed: {err}"),
        },
    }
}

/// Adds a hand-entered detail row and returns its id for the annotation form.
///
/// Input semantics:
/// - `fields`: column/value pairs in display order; at least one value must
///   be non-blank.
///
/// # FFI contract
/// - The id is `new_<millis>` of the simulated clock and never collides with
///   imported `row_<n>` ids.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn create_record(fields: Vec<RecordField>) -> EntryActionResponse {
    let fields = fields
        .into_iter()
        .map(|field| (field.column, field.value))
        .collect();
    match with_inspection_service(|service| service.create_record(fields)) {
        Ok(record) => EntryActionResponse::success("Record created.", Some(record.id)),
        Err(err) => EntryActionResponse::failure(format!("create_record failed: {err}")),
    }
}

/// One row of the summary list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryItem {
    pub date: String,
    pub fit: u32,
    pub unfit: u32,
    pub absent_closed: u32,
    pub other: u32,
    pub yes_count: u32,
    pub no_count: u32,
}

/// Summary list envelope, most recent date first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryListResponse {
    pub items: Vec<SummaryItem>,
    pub message: String,
}

/// Lists per-date summaries.
#[flutter_rust_bridge::frb(sync)]
pub fn summary_list() -> SummaryListResponse {
    match with_inspection_service(|service| service.summaries()) {
        Ok(summaries) => {
            let items = summaries.iter().map(to_summary_item).collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No inspections yet.".to_string()
            } else {
                format!("{} date(s).", items.len())
            };
            SummaryListResponse { items, message }
        }
        Err(err) => SummaryListResponse {
            items: Vec::new(),
            message: format!("summary_list failed: {err}"),
        },
    }
}

/// One imported column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub column: String,
    pub value: String,
}

/// One resolved record of a summary partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntryItem {
    pub record_id: String,
    pub fields: Vec<RecordField>,
    pub memo: String,
    pub judgment: Option<String>,
    pub inspection_result: Option<String>,
    pub photo_path: String,
    /// Display text of the last save, empty when never stamped.
    pub last_activity: String,
}

/// Summary detail envelope for one date and judgment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDetailResponse {
    /// Records in the partition, oldest activity first.
    pub entries: Vec<SummaryEntryItem>,
    /// Listed ids that no longer resolve to stored data.
    pub dropped: u32,
    pub message: String,
}

/// Resolves the `judgment` (`yes|no`) partition of the summary for `date`.
#[flutter_rust_bridge::frb(sync)]
pub fn summary_detail(date: String, judgment: String) -> SummaryDetailResponse {
    let Some(bucket) = JudgmentBucket::parse(&judgment) else {
        return SummaryDetailResponse {
            entries: Vec::new(),
            dropped: 0,
            message: format!("summary_detail failed: unknown judgment `{judgment}`; expected yes|no"),
        };
    };
    match with_inspection_service(|service| service.resolve(date.trim(), bucket)) {
        Ok(resolved) => {
            let dropped = u32::try_from(resolved.dropped).unwrap_or(u32::MAX);
            let entries = resolved
                .entries
                .into_iter()
                .map(to_summary_entry)
                .collect::<Vec<_>>();
            let message = match (entries.len(), dropped) {
                (0, 0) => "No records.".to_string(),
                (count, 0) => format!("{count} record(s)."),
                (count, dropped) => {
                    format!("{count} record(s); {dropped} could not be loaded.")
                }
            };
            SummaryDetailResponse {
                entries,
                dropped,
                message,
            }
        }
        Err(err) => SummaryDetailResponse {
            entries: Vec::new(),
            dropped: 0,
            message: format!("summary_detail failed: {err}"),
        },
    }
}

/// Saves the inspection form for `record_id`.
///
/// Input semantics:
/// - `judgment`: `Yes|No`, or `None` to leave unset.
/// - `inspection_result`: `fit|unfit|absent_closed|other`, or `None`.
/// - `date`: effective date `YYYY-MM-DD`.
///
/// # FFI contract
/// - Keeps the first save's creation stamp; stamps the update with simulated now.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn save_inspection(
    record_id: String,
    memo: String,
    judgment: Option<String>,
    inspection_result: Option<String>,
    date: String,
    photo_path: String,
) -> EntryActionResponse {
    let judgment = match parse_optional(judgment, Judgment::parse) {
        Ok(value) => value,
        Err(raw) => {
            return EntryActionResponse::failure(format!(
                "save_inspection failed: unknown judgment `{raw}`; expected Yes|No"
            ));
        }
    };
    let outcome = match parse_optional(inspection_result, InspectionOutcome::parse) {
        Ok(value) => value,
        Err(raw) => {
            return EntryActionResponse::failure(format!(
                "save_inspection failed: unknown inspection result `{raw}`"
            ));
        }
    };

    let saved = with_inspection_service(|service| {
        let mut inspection = service.open_inspection(record_id.trim())?;
        inspection.memo = memo;
        inspection.judgment = judgment;
        inspection.inspection_result = outcome;
        inspection.date = date.trim().to_string();
        inspection.photo_path = photo_path.trim().to_string();
        service.save_inspection(inspection)
    });
    match saved {
        Ok(inspection) => EntryActionResponse::success("Inspection saved.", Some(inspection.id)),
        Err(err) => EntryActionResponse::failure(format!("save_inspection failed: {err}")),
    }
}

fn parse_optional<T>(
    raw: Option<String>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    match raw {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => parse(text.trim()).map(Some).ok_or(text),
    }
}

fn resolve_entry_db_path() -> PathBuf {
    ENTRY_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(ENTRY_DB_FILE_NAME)
        })
        .clone()
}

fn open_entry_db() -> Result<Connection, String> {
    let db_path = resolve_entry_db_path();
    open_db(&db_path).map_err(|err| {
        warn!(
            "event=entry_db_open module=ffi status=error path={} error={}",
            db_path.display(),
            err
        );
        format!("entry DB open failed: {err}")
    })
}

fn with_settings_service<T>(
    f: impl FnOnce(&SettingsService<SqliteKeyValueStore<'_>, SystemClock>) -> ServiceResult<T>,
) -> Result<T, String> {
    let conn = open_entry_db()?;
    let service = SettingsService::new(SqliteKeyValueStore::new(&conn), SystemClock);
    f(&service).map_err(|err| err.to_string())
}

fn with_inspection_service<T>(
    f: impl FnOnce(&InspectionService<'_, SqliteKeyValueStore<'_>, SystemClock>) -> ServiceResult<T>,
) -> Result<T, String> {
    let conn = open_entry_db()?;
    let store = SqliteKeyValueStore::new(&conn);
    let clock = SettingsService::new(store, SystemClock)
        .clock()
        .map_err(|err| err.to_string())?;
    let service = InspectionService::new(store, &clock);
    f(&service).map_err(|err| err.to_string())
}

fn to_summary_item(summary: &DateSummary) -> SummaryItem {
    SummaryItem {
        date: summary.date.clone(),
        fit: summary.counts.fit,
        unfit: summary.counts.unfit,
        absent_closed: summary.counts.absent_closed,
        other: summary.counts.other,
        yes_count: u32::try_from(summary.yes_items.len()).unwrap_or(u32::MAX),
        no_count: u32::try_from(summary.no_items.len()).unwrap_or(u32::MAX),
    }
}

fn to_summary_entry(entry: ResolvedEntry) -> SummaryEntryItem {
    let ResolvedEntry { detail, inspection } = entry;
    SummaryEntryItem {
        last_activity: inspection
            .activity_instant()
            .map(format_for_display)
            .unwrap_or_default(),
        record_id: detail.id,
        fields: detail
            .fields
            .into_iter()
            .map(|(column, value)| RecordField { column, value })
            .collect(),
        memo: inspection.memo,
        judgment: inspection.judgment.map(|value| value.as_str().to_string()),
        inspection_result: inspection
            .inspection_result
            .map(|value| value.as_str().to_string()),
        photo_path: inspection.photo_path,
    }
}
