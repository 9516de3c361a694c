//! Imported spreadsheet row model.
//!
//! # Responsibility
//! - Hold one flat row exactly as it was imported or entered (ordered
//!   header/value pairs).
//! - Define the order in which records were added.
//!
//! # Invariants
//! - Imported ids are `row_<n>` (1-based sheet row index); manually created
//!   ids are `new_<millis>`. The prefixes keep the two families disjoint.
//! - `fields` keeps the sheet column order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Stable identifier shared by a detail row and its inspection.
pub type RecordId = String;

const ROW_ID_PREFIX: &str = "row_";
const CREATED_ID_PREFIX: &str = "new_";

/// One imported row keyed by a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: RecordId,
    /// Ordered `(column header, cell text)` pairs.
    pub fields: Vec<(String, String)>,
}

impl DetailRecord {
    /// Creates a record whose id is derived from the 1-based row index.
    pub fn from_row(index: usize, fields: Vec<(String, String)>) -> Self {
        Self {
            id: row_id(index),
            fields,
        }
    }

    /// Creates a manually entered record stamped with `stamp_millis`.
    pub fn created(stamp_millis: i64, fields: Vec<(String, String)>) -> Self {
        Self {
            id: created_id(stamp_millis),
            fields,
        }
    }

    /// Whether every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.trim().is_empty())
    }

    /// Returns the cell value for `column`, if the row has that column.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates column headers in sheet order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// Builds the stable id for a 1-based row index.
pub fn row_id(index: usize) -> RecordId {
    format!("{ROW_ID_PREFIX}{index}")
}

/// Builds the id of a manually created record from a millisecond stamp.
pub fn created_id(stamp_millis: i64) -> RecordId {
    format!("{CREATED_ID_PREFIX}{stamp_millis}")
}

/// Orders ids the way records were added: imported rows by row number, then
/// created records by stamp, then any other id by text.
pub fn compare_record_ids(left: &str, right: &str) -> Ordering {
    order_key(left).cmp(&order_key(right))
}

fn order_key(id: &str) -> (u8, i64, &str) {
    let numbered = |prefix: &str| {
        id.strip_prefix(prefix)
            .and_then(|digits| digits.parse::<i64>().ok())
    };
    if let Some(row) = numbered(ROW_ID_PREFIX) {
        (0, row, id)
    } else if let Some(stamp) = numbered(CREATED_ID_PREFIX) {
        (1, stamp, id)
    } else {
        (2, 0, id)
    }
}
