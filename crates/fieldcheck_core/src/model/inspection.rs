//! Inspection annotation model.
//!
//! # Responsibility
//! - Define the per-record annotation (outcome, judgment, memo, photo, date).
//! - Keep the persisted JSON layout tolerant of blank or legacy values.
//!
//! # Invariants
//! - Blank or unrecognized judgment/outcome text loads as unset, never as an error.
//! - `created_at` is kept across saves; `updated_at` moves with every save.
//! - `date` is the effective inspection date and is independent of both timestamps.

use crate::model::record::RecordId;
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Date format accepted for the effective inspection date.
pub const EFFECTIVE_DATE_FORMAT: &str = "%Y-%m-%d";

static EFFECTIVE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid effective date regex"));

/// Binary accept/reject flag attached to an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Judgment {
    Yes,
    No,
}

impl Judgment {
    /// Stored and exported label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }

    /// Parses the stored label. Only the exact labels are recognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Yes" => Some(Self::Yes),
            "No" => Some(Self::No),
            _ => None,
        }
    }
}

/// Mutually exclusive inspection result category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectionOutcome {
    Fit,
    Unfit,
    AbsentClosed,
    Other,
}

impl InspectionOutcome {
    pub const ALL: [Self; 4] = [Self::Fit, Self::Unfit, Self::AbsentClosed, Self::Other];

    /// Stored and exported label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fit => "fit",
            Self::Unfit => "unfit",
            Self::AbsentClosed => "absent_closed",
            Self::Other => "other",
        }
    }

    /// Parses a stored label.
    ///
    /// Accepts the snake_case labels case-insensitively and the legacy
    /// Korean labels written by earlier versions of the data file.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        match trimmed {
            "적합" => return Some(Self::Fit),
            "부적합" => return Some(Self::Unfit),
            "부재종결" => return Some(Self::AbsentClosed),
            "기타" => return Some(Self::Other),
            _ => {}
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "fit" => Some(Self::Fit),
            "unfit" => Some(Self::Unfit),
            "absent_closed" | "absentclosed" => Some(Self::AbsentClosed),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Annotation for one imported record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub id: RecordId,
    #[serde(default)]
    pub memo: String,
    #[serde(default, with = "judgment_text")]
    pub judgment: Option<Judgment>,
    #[serde(default, with = "outcome_text")]
    pub inspection_result: Option<InspectionOutcome>,
    /// Effective inspection date (`YYYY-MM-DD`); grouping key for summaries.
    #[serde(default)]
    pub date: String,
    /// Opaque key into the photo store; empty when no photo is attached.
    #[serde(default)]
    pub photo_path: String,
    #[serde(default, with = "instant_text")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "instant_text")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InspectionRecord {
    /// Creates the draft shown when a record is first opened for annotation.
    ///
    /// # Invariants
    /// - `judgment` defaults to `No`; the outcome starts unset.
    /// - Both timestamps start at `now`.
    pub fn draft(id: impl Into<RecordId>, now: DateTime<Utc>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            memo: String::new(),
            judgment: Some(Judgment::No),
            inspection_result: None,
            date: date.into(),
            photo_path: String::new(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Outcome counted by date summaries; `None` when the outcome is unset or
    /// the record has no effective date.
    pub fn summarized_outcome(&self) -> Option<InspectionOutcome> {
        self.inspection_result.filter(|_| !self.date.is_empty())
    }

    /// Instant of the last annotation activity: `updated_at`, else `created_at`.
    pub fn activity_instant(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    /// Whether a photo reference is attached.
    pub fn has_photo(&self) -> bool {
        !self.photo_path.is_empty()
    }

    /// Validates fields that a save must not persist in a broken state.
    ///
    /// # Errors
    /// - `EmptyId` when `id` is blank.
    /// - `InvalidDate` when `date` is non-empty and not `YYYY-MM-DD`.
    pub fn validate(&self) -> Result<(), InspectionValidationError> {
        if self.id.trim().is_empty() {
            return Err(InspectionValidationError::EmptyId);
        }
        if !self.date.is_empty() && parse_effective_date(&self.date).is_none() {
            return Err(InspectionValidationError::InvalidDate(self.date.clone()));
        }
        Ok(())
    }
}

/// Parses an effective date written exactly as `YYYY-MM-DD`.
///
/// Unpadded forms such as `2024-1-5` are rejected: summaries group by the
/// stored text, so one calendar day must have one spelling.
pub fn parse_effective_date(value: &str) -> Option<NaiveDate> {
    if !EFFECTIVE_DATE_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, EFFECTIVE_DATE_FORMAT).ok()
}

/// Validation failures for inspection writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InspectionValidationError {
    EmptyId,
    InvalidDate(String),
}

impl Display for InspectionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "inspection id cannot be empty"),
            Self::InvalidDate(value) => {
                write!(f, "invalid inspection date `{value}`; expected YYYY-MM-DD")
            }
        }
    }
}

impl Error for InspectionValidationError {}

mod judgment_text {
    use super::Judgment;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Judgment>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map_or("", Judgment::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Judgment>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(Judgment::parse))
    }
}

mod outcome_text {
    use super::InspectionOutcome;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<InspectionOutcome>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map_or("", InspectionOutcome::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<InspectionOutcome>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(InspectionOutcome::parse))
    }
}

mod instant_text {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(instant) => {
                serializer.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|instant| instant.with_timezone(&Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        parse_effective_date, InspectionOutcome, InspectionRecord, InspectionValidationError,
        Judgment,
    };
    use chrono::{TimeZone, Utc};

    #[test]
    fn outcome_parse_accepts_legacy_labels() {
        assert_eq!(InspectionOutcome::parse("적합"), Some(InspectionOutcome::Fit));
        assert_eq!(
            InspectionOutcome::parse("부재종결"),
            Some(InspectionOutcome::AbsentClosed)
        );
        assert_eq!(InspectionOutcome::parse("Unfit"), Some(InspectionOutcome::Unfit));
        assert_eq!(InspectionOutcome::parse(""), None);
        assert_eq!(InspectionOutcome::parse("maybe"), None);
    }

    #[test]
    fn judgment_parse_is_exact() {
        assert_eq!(Judgment::parse("Yes"), Some(Judgment::Yes));
        assert_eq!(Judgment::parse("yes"), None);
        assert_eq!(Judgment::parse(""), None);
    }

    #[test]
    fn draft_defaults_to_no_judgment_and_unset_outcome() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let draft = InspectionRecord::draft("row_1", now, "2024-03-01");
        assert_eq!(draft.judgment, Some(Judgment::No));
        assert_eq!(draft.inspection_result, None);
        assert_eq!(draft.created_at, Some(now));
        assert_eq!(draft.updated_at, Some(now));
        assert_eq!(draft.summarized_outcome(), None);
    }

    #[test]
    fn lenient_json_loads_blank_and_garbled_values_as_unset() {
        let json = r#"{
            "id": "row_7",
            "memo": "",
            "judgment": "maybe",
            "inspectionResult": "",
            "date": "2024-01-01",
            "photoPath": "",
            "createdAt": "not a time",
            "updatedAt": "2024-01-01T10:00:00.000Z"
        }"#;
        let record: InspectionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.judgment, None);
        assert_eq!(record.inspection_result, None);
        assert_eq!(record.created_at, None);
        assert_eq!(
            record.updated_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn summarized_outcome_needs_a_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut record = InspectionRecord::draft("row_1", now, "");
        record.inspection_result = Some(InspectionOutcome::Fit);
        assert_eq!(record.summarized_outcome(), None);
        record.date = "2024-03-01".to_string();
        assert_eq!(record.summarized_outcome(), Some(InspectionOutcome::Fit));
    }

    #[test]
    fn effective_date_must_be_zero_padded() {
        assert!(parse_effective_date("2024-01-05").is_some());
        assert_eq!(parse_effective_date("2024-1-5"), None);
        assert_eq!(parse_effective_date(" 2024-01-05"), None);
        assert_eq!(parse_effective_date("2024-02-30"), None);
    }

    #[test]
    fn activity_instant_prefers_updated_at() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut record = InspectionRecord::draft("row_1", created, "2024-01-01");
        record.updated_at = Some(updated);
        assert_eq!(record.activity_instant(), Some(updated));
        record.updated_at = None;
        assert_eq!(record.activity_instant(), Some(created));
    }

    #[test]
    fn validate_rejects_malformed_date() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let record = InspectionRecord::draft("row_1", now, "2024/01/01");
        assert_eq!(
            record.validate(),
            Err(InspectionValidationError::InvalidDate("2024/01/01".to_string()))
        );
    }
}
