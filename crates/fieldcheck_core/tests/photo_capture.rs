use chrono::{DateTime, Local, TimeZone, Utc};
use fieldcheck_core::db::open_db_in_memory;
use fieldcheck_core::{
    CaptureError, CapturedPhoto, FilePhotoCapture, InspectionRecord, PhotoCapture, PhotoService,
    PhotoStore, RepoError, ServiceError, ServiceResult, SqlitePhotoStore,
};
use std::cell::Cell;

struct FakeCamera {
    shots: Cell<u8>,
    deny: bool,
}

impl FakeCamera {
    fn new() -> Self {
        Self {
            shots: Cell::new(0),
            deny: false,
        }
    }

    fn denied() -> Self {
        Self {
            shots: Cell::new(0),
            deny: true,
        }
    }
}

impl PhotoCapture for FakeCamera {
    fn capture(&self) -> Result<CapturedPhoto, CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied);
        }
        let shot = self.shots.get() + 1;
        self.shots.set(shot);
        Ok(CapturedPhoto {
            data: vec![0xFF, 0xD8, shot],
            suggested_name: "image.jpg".to_string(),
        })
    }
}

fn local_instant(h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(2024, 6, 1, h, mi, s)
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

fn blank_inspection() -> InspectionRecord {
    InspectionRecord::draft("row_1", local_instant(9, 0, 0), "2024-06-01")
}

#[test]
fn captured_photo_is_stored_under_clock_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);
    let service = PhotoService::new(store, FakeCamera::new());

    let name = service.capture_and_store(local_instant(9, 8, 7)).unwrap();

    assert_eq!(name, "20240601_090807.jpg");
    assert_eq!(service.load_photo(&name).unwrap(), vec![0xFF, 0xD8, 1]);
    assert_eq!(store.list_names().unwrap(), [name]);
}

fn keep(inspection: InspectionRecord) -> ServiceResult<InspectionRecord> {
    Ok(inspection)
}

#[test]
fn replacing_a_photo_deletes_the_previous_one() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);
    let service = PhotoService::new(store, FakeCamera::new());

    let first = service.capture_and_store(local_instant(9, 0, 0)).unwrap();
    let inspection = service
        .attach_photo(blank_inspection(), &first, keep)
        .unwrap();
    let second = service.capture_and_store(local_instant(9, 0, 30)).unwrap();
    let inspection = service.attach_photo(inspection, &second, keep).unwrap();

    assert_eq!(inspection.photo_path, second);
    assert_eq!(store.list_names().unwrap(), [second.clone()]);

    // Re-attaching the same photo keeps it.
    service.attach_photo(inspection, &second, keep).unwrap();
    assert_eq!(store.list_names().unwrap(), [second]);
}

#[test]
fn failed_save_keeps_the_attached_photo_and_drops_the_new_one() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);
    let service = PhotoService::new(store, FakeCamera::new());

    let first = service.capture_and_store(local_instant(9, 0, 0)).unwrap();
    let inspection = service
        .attach_photo(blank_inspection(), &first, keep)
        .unwrap();
    let second = service.capture_and_store(local_instant(9, 5, 0)).unwrap();

    let err = service
        .attach_photo(inspection.clone(), &second, |_| {
            Err(ServiceError::RecordNotFound("row_1".to_string()))
        })
        .unwrap_err();

    assert!(matches!(err, ServiceError::RecordNotFound(_)));
    assert_eq!(store.list_names().unwrap(), [first.clone()]);
    assert_eq!(inspection.photo_path, first);
}

#[test]
fn detaching_deletes_and_clears_reference() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);
    let service = PhotoService::new(store, FakeCamera::new());

    let name = service.capture_and_store(local_instant(10, 0, 0)).unwrap();
    let inspection = service
        .attach_photo(blank_inspection(), &name, keep)
        .unwrap();
    let inspection = service.detach_photo(inspection, keep).unwrap();

    assert!(!inspection.has_photo());
    assert!(store.list_names().unwrap().is_empty());
    assert!(matches!(
        service.load_photo(&name),
        Err(ServiceError::PhotoNotFound(missing)) if missing == name
    ));

    // Detaching again is a no-op.
    service.detach_photo(inspection, keep).unwrap();
}

#[test]
fn failed_detach_keeps_the_image() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);
    let service = PhotoService::new(store, FakeCamera::new());

    let name = service.capture_and_store(local_instant(10, 0, 0)).unwrap();
    let inspection = service
        .attach_photo(blank_inspection(), &name, keep)
        .unwrap();
    service
        .detach_photo(inspection, |_| Err(ServiceError::EmptyRecord))
        .unwrap_err();

    assert_eq!(store.list_names().unwrap(), [name]);
}

#[test]
fn denied_capture_stores_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);
    let service = PhotoService::new(store, FakeCamera::denied());

    let err = service.capture_and_store(local_instant(9, 0, 0)).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Capture(CaptureError::PermissionDenied)
    ));
    assert!(store.list_names().unwrap().is_empty());
}

#[test]
fn path_like_photo_names_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePhotoStore::new(&conn);

    let err = store.store("../escape.jpg", b"x").unwrap_err();
    assert!(matches!(err, RepoError::InvalidKey(_)));
    assert!(store.retrieve("").is_err());
}

#[test]
fn file_capture_reads_image_and_keeps_png_extension() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("shot.PNG");
    std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();

    let conn = open_db_in_memory().unwrap();
    let service = PhotoService::new(SqlitePhotoStore::new(&conn), FilePhotoCapture::new(&image));
    let name = service.capture_and_store(local_instant(11, 12, 13)).unwrap();

    assert_eq!(name, "20240601_111213.png");
    assert_eq!(
        service.load_photo(&name).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );

    let missing = PhotoService::new(
        SqlitePhotoStore::new(&conn),
        FilePhotoCapture::new(dir.path().join("absent.jpg")),
    );
    assert!(matches!(
        missing.capture_and_store(local_instant(11, 12, 14)),
        Err(ServiceError::Capture(CaptureError::Unavailable(_)))
    ));
}
