//! Core domain logic for FieldCheck.
//! This crate owns the simulated clock, inspection aggregation and the
//! record/photo stores behind them.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod summary;
pub mod tabular;

pub use clock::{
    format_for_display, ClockError, ManualClock, SimulatedClock, SystemClock, WallClock,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::inspection::{InspectionOutcome, InspectionRecord, Judgment};
pub use model::record::{DetailRecord, RecordId};
pub use model::settings::TimeAnchor;
pub use repo::photo_repo::{PhotoStore, SqlitePhotoStore};
pub use repo::{KeyValueStore, RepoError, RepoResult, SqliteKeyValueStore};
pub use search::records::SearchScope;
pub use service::inspection_service::InspectionService;
pub use service::photo_service::{
    CaptureError, CapturedPhoto, FilePhotoCapture, PhotoCapture, PhotoService,
};
pub use service::settings_service::SettingsService;
pub use service::{ServiceError, ServiceResult};
pub use summary::{
    resolve_partition, summarize, DateSummary, JudgmentBucket, OutcomeCounts, ResolvedEntry,
    ResolvedPartition,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
