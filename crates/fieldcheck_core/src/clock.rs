//! Simulated clock projected from a user-configured anchor.
//!
//! # Responsibility
//! - Compute "current" instants as `anchor + (real_now - reference_instant)`.
//! - Fall back to real time when the anchor cannot be parsed.
//! - Render instants for display and derive date/photo-name strings.
//!
//! # Invariants
//! - Reads are pure functions of the anchor snapshot and the wall clock.
//! - Between two reads the result advances by exactly the real elapsed time.
//! - `now()` never returns an error; configuration problems are logged.

use crate::model::settings::{TimeAnchor, ANCHOR_DATE_FORMAT, ANCHOR_TIME_FORMAT};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DISPLAY_FORMAT: &str = "%Y. %m. %d. %H:%M:%S";
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const PHOTO_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";
const PHOTO_EXTENSION: &str = "jpg";

static ANCHOR_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid anchor date regex"));
static ANCHOR_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid anchor time regex"));

/// Source of real wall-clock time.
pub trait WallClock {
    fn now(&self) -> DateTime<Utc>;
}

impl<W: WallClock + ?Sized> WallClock for &W {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Production wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Reasons an anchor snapshot cannot produce a simulated instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    InvalidAnchorDate(String),
    InvalidAnchorTime(String),
    /// The anchor falls into a local-time gap (e.g. a DST jump).
    NonexistentLocalTime(String),
    InvalidReferenceInstant(String),
    OutOfRange,
}

impl Display for ClockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAnchorDate(value) => {
                write!(f, "invalid anchor date `{value}`; expected YYYY-MM-DD")
            }
            Self::InvalidAnchorTime(value) => {
                write!(f, "invalid anchor time `{value}`; expected HH:mm")
            }
            Self::NonexistentLocalTime(value) => {
                write!(f, "anchor `{value}` does not exist in the local time zone")
            }
            Self::InvalidReferenceInstant(value) => {
                write!(f, "invalid reference instant `{value}`")
            }
            Self::OutOfRange => write!(f, "simulated instant is out of range"),
        }
    }
}

impl Error for ClockError {}

/// Clock that advances in real time from a configurable anchor.
pub struct SimulatedClock<W: WallClock> {
    anchor: TimeAnchor,
    wall: W,
}

impl<W: WallClock> SimulatedClock<W> {
    pub fn new(anchor: TimeAnchor, wall: W) -> Self {
        Self { anchor, wall }
    }

    /// Replaces the anchor snapshot with freshly loaded settings.
    pub fn reload(&mut self, anchor: TimeAnchor) {
        self.anchor = anchor;
    }

    /// Current anchor snapshot.
    pub fn anchor(&self) -> &TimeAnchor {
        &self.anchor
    }

    /// Projects real elapsed time onto the anchor.
    ///
    /// A missing reference instant means the anchor was never established;
    /// elapsed time is then zero and the anchor itself is returned.
    ///
    /// # Errors
    /// - Returns `ClockError` when the anchor or reference instant cannot be parsed.
    pub fn try_now(&self) -> Result<DateTime<Utc>, ClockError> {
        let anchor_instant = anchor_instant(&self.anchor)?;
        let real_now = self.wall.now();
        let reference = match self.anchor.reference_instant.as_deref() {
            Some(text) => parse_reference_instant(text)?,
            None => real_now,
        };
        let elapsed = real_now.signed_duration_since(reference);
        anchor_instant
            .checked_add_signed(elapsed)
            .ok_or(ClockError::OutOfRange)
    }

    /// Simulated instant, or real time when the anchor is unusable.
    pub fn now(&self) -> DateTime<Utc> {
        match self.try_now() {
            Ok(instant) => instant,
            Err(err) => {
                warn!(
                    "event=clock_fallback module=clock status=degraded error={}",
                    err
                );
                self.wall.now()
            }
        }
    }

    /// Whether the current snapshot yields a simulated instant.
    pub fn is_valid(&self) -> bool {
        self.try_now().is_ok()
    }
}

/// Combines anchor date and time-of-day into a local instant (seconds = 0).
///
/// # Errors
/// - Rejects text not shaped exactly as `YYYY-MM-DD` / `HH:mm`.
/// - Rejects calendar-invalid values and local-time gaps.
pub fn anchor_instant(anchor: &TimeAnchor) -> Result<DateTime<Utc>, ClockError> {
    let date_text = anchor.anchor_date.trim();
    let time_text = anchor.anchor_time.trim();

    if !ANCHOR_DATE_RE.is_match(date_text) {
        return Err(ClockError::InvalidAnchorDate(date_text.to_string()));
    }
    if !ANCHOR_TIME_RE.is_match(time_text) {
        return Err(ClockError::InvalidAnchorTime(time_text.to_string()));
    }

    let date = NaiveDate::parse_from_str(date_text, ANCHOR_DATE_FORMAT)
        .map_err(|_| ClockError::InvalidAnchorDate(date_text.to_string()))?;
    let time = NaiveTime::parse_from_str(time_text, ANCHOR_TIME_FORMAT)
        .map_err(|_| ClockError::InvalidAnchorTime(time_text.to_string()))?;
    let naive = date.and_time(time);

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ClockError::NonexistentLocalTime(format!("{date_text}T{time_text}")))
}

fn parse_reference_instant(text: &str) -> Result<DateTime<Utc>, ClockError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| ClockError::InvalidReferenceInstant(text.to_string()))
}

/// Renders an instant in local time with second resolution.
pub fn format_for_display(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format(DISPLAY_FORMAT)
        .to_string()
}

/// Local calendar date of `instant` as `YYYY-MM-DD`.
pub fn simulated_date(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format(DATE_KEY_FORMAT)
        .to_string()
}

/// Photo file name derived from `instant`: `YYYYMMDD_HHMMSS.jpg` in local time.
pub fn photo_file_name(instant: DateTime<Utc>) -> String {
    format!(
        "{}.{PHOTO_EXTENSION}",
        instant.with_timezone(&Local).format(PHOTO_NAME_FORMAT)
    )
}
