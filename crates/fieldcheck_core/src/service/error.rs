//! Service-layer error shared by the inspection, settings and photo services.

use crate::clock::ClockError;
use crate::model::inspection::InspectionValidationError;
use crate::model::record::RecordId;
use crate::repo::RepoError;
use crate::service::photo_service::CaptureError;
use crate::tabular::TabularError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Tabular(TabularError),
    /// Anchor date/time rejected by the settings form.
    InvalidAnchor(ClockError),
    InvalidInspection(InspectionValidationError),
    /// No detail row carries this id.
    RecordNotFound(RecordId),
    /// A manually created record must carry at least one non-blank value.
    EmptyRecord,
    Capture(CaptureError),
    PhotoNotFound(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Tabular(err) => write!(f, "{err}"),
            Self::InvalidAnchor(err) => write!(f, "{err}"),
            Self::InvalidInspection(err) => write!(f, "{err}"),
            Self::RecordNotFound(id) => write!(f, "record not found: {id}"),
            Self::EmptyRecord => write!(f, "record has no non-blank value"),
            Self::Capture(err) => write!(f, "photo capture failed: {err}"),
            Self::PhotoNotFound(name) => write!(f, "photo not found: {name}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Tabular(err) => Some(err),
            Self::InvalidAnchor(err) => Some(err),
            Self::InvalidInspection(err) => Some(err),
            Self::Capture(err) => Some(err),
            Self::RecordNotFound(_) | Self::EmptyRecord | Self::PhotoNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<TabularError> for ServiceError {
    fn from(value: TabularError) -> Self {
        Self::Tabular(value)
    }
}

impl From<InspectionValidationError> for ServiceError {
    fn from(value: InspectionValidationError) -> Self {
        Self::InvalidInspection(value)
    }
}

impl From<CaptureError> for ServiceError {
    fn from(value: CaptureError) -> Self {
        Self::Capture(value)
    }
}
