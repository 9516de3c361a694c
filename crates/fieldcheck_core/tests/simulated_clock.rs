use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use fieldcheck_core::clock::{anchor_instant, simulated_date};
use fieldcheck_core::db::open_db_in_memory;
use fieldcheck_core::repo::settings_repo::SettingsRepository;
use fieldcheck_core::{
    format_for_display, ClockError, ManualClock, ServiceError, SettingsService, SimulatedClock,
    SqliteKeyValueStore, TimeAnchor,
};

fn local_instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

fn anchored_at(date: &str, time: &str, reference: DateTime<Utc>) -> TimeAnchor {
    let mut anchor = TimeAnchor::new(date, time);
    anchor.set_reference_instant(reference);
    anchor
}

#[test]
fn simulated_time_advances_with_real_time_without_drift() {
    let real_start = Utc.with_ymd_and_hms(2030, 3, 4, 5, 6, 7).unwrap();
    let wall = ManualClock::new(real_start);
    let clock = SimulatedClock::new(anchored_at("2024-01-15", "09:00", real_start), &wall);
    let anchor = local_instant(2024, 1, 15, 9, 0, 0);

    assert_eq!(clock.try_now().unwrap(), anchor);

    // Many small steps must land exactly where one big step would.
    for _ in 0..3600 {
        wall.advance(Duration::milliseconds(250));
    }
    assert_eq!(clock.now(), anchor + Duration::minutes(15));

    wall.advance(Duration::hours(30));
    assert_eq!(
        clock.now(),
        anchor + Duration::minutes(15) + Duration::hours(30)
    );
    assert_eq!(simulated_date(clock.now()), "2024-01-16");
}

#[test]
fn missing_reference_instant_means_zero_elapsed() {
    let wall = ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    let clock = SimulatedClock::new(TimeAnchor::new("2024-02-29", "23:59"), &wall);

    assert_eq!(clock.try_now().unwrap(), local_instant(2024, 2, 29, 23, 59, 0));
    wall.advance(Duration::minutes(5));
    assert_eq!(clock.try_now().unwrap(), local_instant(2024, 2, 29, 23, 59, 0));
}

#[test]
fn invalid_anchor_falls_back_to_real_time() {
    let real_now = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
    let wall = ManualClock::new(real_now);

    let cases = [
        ("2024-02-30", "09:00"),
        ("2024-1-5", "09:00"),
        ("2024-01-05", "24:00"),
        ("2024-01-05", "9:00"),
        ("", ""),
    ];
    for (date, time) in cases {
        let clock = SimulatedClock::new(anchored_at(date, time, real_now), &wall);
        assert!(!clock.is_valid(), "{date} {time} should be rejected");
        assert_eq!(clock.now(), real_now);
    }

    let mut bad_reference = TimeAnchor::new("2024-01-05", "09:00");
    bad_reference.reference_instant = Some("yesterday".to_string());
    let clock = SimulatedClock::new(bad_reference, &wall);
    assert_eq!(
        clock.try_now().unwrap_err(),
        ClockError::InvalidReferenceInstant("yesterday".to_string())
    );
    assert_eq!(clock.now(), real_now);
}

#[test]
fn anchor_errors_name_the_offending_part() {
    assert_eq!(
        anchor_instant(&TimeAnchor::new("2024-13-01", "09:00")).unwrap_err(),
        ClockError::InvalidAnchorDate("2024-13-01".to_string())
    );
    assert_eq!(
        anchor_instant(&TimeAnchor::new("2024-12-01", "09:60")).unwrap_err(),
        ClockError::InvalidAnchorTime("09:60".to_string())
    );
}

#[test]
fn reload_picks_up_new_settings() {
    let real_start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let wall = ManualClock::new(real_start);
    let mut clock = SimulatedClock::new(anchored_at("2024-01-01", "08:00", real_start), &wall);
    wall.advance(Duration::minutes(10));
    assert_eq!(clock.now(), local_instant(2024, 1, 1, 8, 10, 0));

    clock.reload(anchored_at("2024-05-05", "17:30", real_start));
    assert_eq!(clock.now(), local_instant(2024, 5, 5, 17, 40, 0));
    assert_eq!(clock.anchor().anchor_date, "2024-05-05");
}

#[test]
fn display_format_is_dotted_with_seconds() {
    let instant = local_instant(2024, 3, 9, 7, 5, 3);
    assert_eq!(format_for_display(instant), "2024. 03. 09. 07:05:03");
}

#[test]
fn reference_instant_is_initialized_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::new(&conn);
    let wall = ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    let service = SettingsService::new(store, &wall);

    assert!(service.ensure_reference_instant().unwrap());
    let first = SettingsRepository::new(store).load().unwrap().unwrap();

    wall.advance(Duration::hours(2));
    assert!(!service.ensure_reference_instant().unwrap());
    let second = SettingsRepository::new(store).load().unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(
        second.reference_instant.as_deref(),
        Some("2030-01-01T00:00:00.000Z")
    );
}

#[test]
fn unset_settings_start_at_real_local_time() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::new(&conn);
    let real_now = local_instant(2030, 7, 8, 14, 25, 0);
    let wall = ManualClock::new(real_now);
    let service = SettingsService::new(store, &wall);

    service.ensure_reference_instant().unwrap();
    let clock = service.clock().unwrap();
    assert_eq!(clock.anchor().anchor_date, "2030-07-08");
    assert_eq!(clock.anchor().anchor_time, "14:25");
    assert_eq!(clock.now(), real_now);
}

#[test]
fn saving_anchor_keeps_reference_and_rejects_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::new(&conn);
    let real_start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let wall = ManualClock::new(real_start);
    let service = SettingsService::new(store, &wall);
    service.ensure_reference_instant().unwrap();

    wall.advance(Duration::minutes(45));
    let saved = service.save_anchor(" 2024-06-01 ", "09:00").unwrap();
    assert_eq!(saved.anchor_date, "2024-06-01");
    assert_eq!(
        saved.reference_instant.as_deref(),
        Some("2030-01-01T00:00:00.000Z")
    );
    // Elapsed time since the original reference still counts.
    assert_eq!(
        service.clock().unwrap().now(),
        local_instant(2024, 6, 1, 9, 45, 0)
    );

    let err = service.save_anchor("2024-06-31", "09:00").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidAnchor(ClockError::InvalidAnchorDate(_))
    ));
    assert_eq!(service.load_anchor().unwrap(), saved);
}

#[test]
fn reset_reference_restarts_from_anchor() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKeyValueStore::new(&conn);
    let wall = ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    let service = SettingsService::new(store, &wall);
    service.ensure_reference_instant().unwrap();
    service.save_anchor("2024-06-01", "09:00").unwrap();

    wall.advance(Duration::hours(3));
    service.reset_reference_instant().unwrap();
    let mut clock = SimulatedClock::new(TimeAnchor::new("1999-01-01", "00:00"), &wall);
    service.reload_clock(&mut clock).unwrap();
    assert_eq!(clock.now(), local_instant(2024, 6, 1, 9, 0, 0));
}
