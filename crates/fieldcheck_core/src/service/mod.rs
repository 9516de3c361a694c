//! Use-case services for inspection workflows.
//!
//! # Responsibility
//! - Orchestrate repositories, the simulated clock and the aggregator into
//!   use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod error;
pub mod inspection_service;
pub mod photo_service;
pub mod settings_service;

pub use error::{ServiceError, ServiceResult};
