//! Tabular import/export for detail rows and their annotations.
//!
//! # Responsibility
//! - Parse a spreadsheet (`.xlsx` workbook or CSV, header row first) into
//!   `DetailRecord`s.
//! - Build the combined export in either format: detail columns followed by
//!   annotation columns.
//!
//! # Invariants
//! - Imported ids are `row_<n>` over non-blank data rows, starting at 1.
//! - Export column order is fixed: detail columns (first-seen order), then
//!   `ANNOTATION_COLUMNS`.

mod codec;

pub use codec::{
    backup_file_name, build_spreadsheet, parse_spreadsheet, SpreadsheetFormat, TabularError,
    TabularResult, ANNOTATION_COLUMNS,
};
