//! Photo capture and attachment use-cases.
//!
//! # Responsibility
//! - Capture an image through a `PhotoCapture` device and store it.
//! - Attach/detach stored photos on inspections.
//!
//! # Invariants
//! - Stored names are derived from the simulated clock: `YYYYMMDD_HHMMSS.<ext>`.
//! - Detaching a photo deletes it from the store and clears `photo_path`.
//! - Replacing an attached photo deletes the previous image.
//! - Images are deleted only after the inspection change is saved.

use crate::clock::photo_file_name;
use crate::model::inspection::InspectionRecord;
use crate::repo::photo_repo::PhotoStore;
use crate::service::error::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_PHOTO_EXTENSION: &str = "jpg";
const ALLOWED_PHOTO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image captured by a device, with the name the device suggests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub data: Vec<u8>,
    pub suggested_name: String,
}

/// Capture failure reported by a device.
#[derive(Debug)]
pub enum CaptureError {
    PermissionDenied,
    Unavailable(String),
    Io(std::io::Error),
}

impl Display for CaptureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "camera permission denied"),
            Self::Unavailable(reason) => write!(f, "camera unavailable: {reason}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CaptureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::PermissionDenied | Self::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(value),
        }
    }
}

/// Camera-like device producing one image per call.
pub trait PhotoCapture {
    fn capture(&self) -> Result<CapturedPhoto, CaptureError>;
}

/// Capture source that reads an existing image file.
#[derive(Debug, Clone)]
pub struct FilePhotoCapture {
    path: PathBuf,
}

impl FilePhotoCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PhotoCapture for FilePhotoCapture {
    fn capture(&self) -> Result<CapturedPhoto, CaptureError> {
        if !self.path.is_file() {
            return Err(CaptureError::Unavailable(format!(
                "`{}` is not a file",
                self.path.display()
            )));
        }
        let data = std::fs::read(&self.path)?;
        let suggested_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(CapturedPhoto {
            data,
            suggested_name,
        })
    }
}

/// Photo use-cases over a store and a capture device.
pub struct PhotoService<P: PhotoStore, C: PhotoCapture> {
    store: P,
    device: C,
}

impl<P: PhotoStore, C: PhotoCapture> PhotoService<P, C> {
    pub fn new(store: P, device: C) -> Self {
        Self { store, device }
    }

    /// Captures one image and stores it under a clock-derived name.
    ///
    /// The extension follows the device's suggested name when it is a known
    /// image type, otherwise `jpg`.
    pub fn capture_and_store(&self, now: DateTime<Utc>) -> ServiceResult<String> {
        let captured = match self.device.capture() {
            Ok(captured) => captured,
            Err(err) => {
                warn!(
                    "event=photo_capture module=service status=error error={}",
                    err
                );
                return Err(err.into());
            }
        };
        let name = stored_photo_name(now, &captured.suggested_name);
        self.store.store(&name, &captured.data)?;
        info!(
            "event=photo_capture module=service status=ok name={} bytes={}",
            name,
            captured.data.len()
        );
        Ok(name)
    }

    /// Points `inspection` at `name`, persists it through `save`, then
    /// deletes the image it replaced.
    ///
    /// When `save` fails nothing is deleted except `name` itself (unless it
    /// was already attached), so the stored record never references a
    /// missing image.
    pub fn attach_photo<F>(
        &self,
        mut inspection: InspectionRecord,
        name: &str,
        save: F,
    ) -> ServiceResult<InspectionRecord>
    where
        F: FnOnce(InspectionRecord) -> ServiceResult<InspectionRecord>,
    {
        let previous = std::mem::replace(&mut inspection.photo_path, name.to_string());
        let saved = match save(inspection) {
            Ok(saved) => saved,
            Err(err) => {
                if previous != name {
                    self.discard(name);
                }
                return Err(err);
            }
        };
        if !previous.is_empty() && previous != name {
            self.store.delete(&previous)?;
        }
        Ok(saved)
    }

    /// Clears the photo reference, persists through `save`, then deletes the
    /// image. A record without a photo is saved unchanged.
    pub fn detach_photo<F>(
        &self,
        mut inspection: InspectionRecord,
        save: F,
    ) -> ServiceResult<InspectionRecord>
    where
        F: FnOnce(InspectionRecord) -> ServiceResult<InspectionRecord>,
    {
        let previous = std::mem::take(&mut inspection.photo_path);
        let saved = save(inspection)?;
        if !previous.is_empty() {
            self.store.delete(&previous)?;
        }
        Ok(saved)
    }

    /// Loads stored image bytes.
    ///
    /// # Errors
    /// - `PhotoNotFound` when nothing is stored under `name`.
    pub fn load_photo(&self, name: &str) -> ServiceResult<Vec<u8>> {
        self.store
            .retrieve(name)?
            .ok_or_else(|| ServiceError::PhotoNotFound(name.to_string()))
    }

    fn discard(&self, name: &str) {
        if let Err(err) = self.store.delete(name) {
            warn!(
                "event=photo_discard module=service status=error name={} error={}",
                name, err
            );
        }
    }
}

fn stored_photo_name(now: DateTime<Utc>, suggested_name: &str) -> String {
    let stem_name = photo_file_name(now);
    let extension = Path::new(suggested_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_PHOTO_EXTENSIONS.contains(&ext.as_str()));

    match extension {
        Some(ext) if ext != DEFAULT_PHOTO_EXTENSION => {
            let stem = stem_name
                .strip_suffix(&format!(".{DEFAULT_PHOTO_EXTENSION}"))
                .unwrap_or(&stem_name);
            format!("{stem}.{ext}")
        }
        _ => stem_name,
    }
}
