//! Substring search over detail rows.
//!
//! # Invariants
//! - Matching is case-insensitive.
//! - A blank term matches every row.
//! - Result order is the input (import) order.

use crate::model::record::DetailRecord;

/// Which cells a search term is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the named column.
    Column(String),
    /// Every column of the row.
    All,
}

/// Returns rows whose scoped cells contain `term`.
pub fn search_records<'a>(
    records: &'a [DetailRecord],
    term: &str,
    scope: &SearchScope,
) -> Vec<&'a DetailRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return records.iter().collect();
    }

    records
        .iter()
        .filter(|record| match scope {
            SearchScope::Column(column) => record
                .field(column)
                .is_some_and(|value| contains_folded(value, &needle)),
            SearchScope::All => record
                .fields
                .iter()
                .any(|(_, value)| contains_folded(value, &needle)),
        })
        .collect()
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
