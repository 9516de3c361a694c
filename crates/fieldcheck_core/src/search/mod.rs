//! Record search over imported detail rows.
//!
//! # Responsibility
//! - Expose case-insensitive substring search over one column or all columns.

pub mod records;
