//! Simulated-time anchor settings.
//!
//! # Responsibility
//! - Hold the user-entered anchor date/time and the real instant it was set at.
//!
//! # Invariants
//! - `anchor_date`/`anchor_time` keep the raw form text; parsing happens at read time.
//! - `reference_instant` is written once unless explicitly reset.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Date format used by `anchor_date`.
pub const ANCHOR_DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day format used by `anchor_time`.
pub const ANCHOR_TIME_FORMAT: &str = "%H:%M";

/// Anchor from which simulated time is projected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAnchor {
    #[serde(rename = "currentDate", default)]
    pub anchor_date: String,
    #[serde(rename = "baseTime", default)]
    pub anchor_time: String,
    /// RFC 3339 text of the real instant the anchor was established at.
    #[serde(
        rename = "appStartTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_instant: Option<String>,
}

impl TimeAnchor {
    /// Creates an anchor without a reference instant.
    pub fn new(anchor_date: impl Into<String>, anchor_time: impl Into<String>) -> Self {
        Self {
            anchor_date: anchor_date.into(),
            anchor_time: anchor_time.into(),
            reference_instant: None,
        }
    }

    /// Anchor equal to `real_now`, established at `real_now`.
    ///
    /// Used when nothing has been stored yet, so simulated time starts out
    /// equal to real local time (truncated to the minute).
    pub fn starting_at(real_now: DateTime<Utc>) -> Self {
        let local = real_now.with_timezone(&Local);
        let mut anchor = Self::new(
            local.format(ANCHOR_DATE_FORMAT).to_string(),
            local.format(ANCHOR_TIME_FORMAT).to_string(),
        );
        anchor.set_reference_instant(real_now);
        anchor
    }

    /// Overwrites the reference instant.
    pub fn set_reference_instant(&mut self, instant: DateTime<Utc>) {
        self.reference_instant = Some(instant.to_rfc3339_opts(SecondsFormat::Millis, true));
    }

    /// Returns a copy with the same reference instant but new date/time text.
    pub fn with_anchor(&self, anchor_date: &str, anchor_time: &str) -> Self {
        Self {
            anchor_date: anchor_date.trim().to_string(),
            anchor_time: anchor_time.trim().to_string(),
            reference_instant: self.reference_instant.clone(),
        }
    }
}
