//! Flutter-facing bindings for FieldCheck.

pub mod api;
