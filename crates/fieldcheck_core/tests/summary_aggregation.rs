use chrono::{DateTime, TimeZone, Utc};
use fieldcheck_core::summary::{find_summary, resolve_summary};
use fieldcheck_core::{
    resolve_partition, summarize, DetailRecord, InspectionOutcome, InspectionRecord, Judgment,
    JudgmentBucket,
};
use std::collections::{BTreeMap, HashSet};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
}

fn inspection(
    id: &str,
    date: &str,
    judgment: Option<Judgment>,
    outcome: Option<InspectionOutcome>,
) -> InspectionRecord {
    InspectionRecord {
        id: id.to_string(),
        memo: String::new(),
        judgment,
        inspection_result: outcome,
        date: date.to_string(),
        photo_path: String::new(),
        created_at: None,
        updated_at: None,
    }
}

fn detail(id: &str, meter: &str) -> DetailRecord {
    DetailRecord {
        id: id.to_string(),
        fields: vec![("meter_no".to_string(), meter.to_string())],
    }
}

fn by_id(records: Vec<InspectionRecord>) -> BTreeMap<String, InspectionRecord> {
    records
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect()
}

#[test]
fn groups_by_date_and_counts_outcomes() {
    use InspectionOutcome::{AbsentClosed, Fit, Other, Unfit};
    let records = vec![
        inspection("a", "2024-06-01", Some(Judgment::Yes), Some(Fit)),
        inspection("b", "2024-06-01", Some(Judgment::No), Some(Unfit)),
        inspection("c", "2024-06-01", None, Some(Fit)),
        inspection("d", "2024-06-02", Some(Judgment::Yes), Some(AbsentClosed)),
        inspection("e", "2024-05-31", Some(Judgment::No), Some(Other)),
        // Not summarizable: no outcome, or no date.
        inspection("f", "2024-06-01", Some(Judgment::Yes), None),
        inspection("g", "", Some(Judgment::Yes), Some(Fit)),
    ];

    let summaries = summarize(&records);

    let dates: Vec<&str> = summaries.iter().map(|s| s.date.as_str()).collect();
    assert_eq!(dates, ["2024-06-02", "2024-06-01", "2024-05-31"]);

    let june_first = find_summary(&summaries, "2024-06-01").unwrap();
    assert_eq!(june_first.counts.fit, 2);
    assert_eq!(june_first.counts.unfit, 1);
    assert_eq!(june_first.counts.get(Fit), 2);
    assert_eq!(june_first.counts.total(), 3);
    assert_eq!(june_first.yes_items, ["a"]);
    assert_eq!(june_first.no_items, ["b", "c"]);

    let june_second = find_summary(&summaries, "2024-06-02").unwrap();
    assert_eq!(june_second.counts.absent_closed, 1);
    assert_eq!(june_second.partition(JudgmentBucket::Yes), ["d"]);

    assert!(find_summary(&summaries, "2024-06-03").is_none());
}

#[test]
fn every_summarizable_record_lands_in_exactly_one_partition() {
    let outcomes = InspectionOutcome::ALL;
    let judgments = [Some(Judgment::Yes), Some(Judgment::No), None];
    let mut records = Vec::new();
    for index in 0..60 {
        let date = format!("2024-06-{:02}", 1 + index % 7);
        records.push(inspection(
            &format!("row_{index}"),
            &date,
            judgments[index % judgments.len()],
            Some(outcomes[index % outcomes.len()]),
        ));
    }
    records.push(inspection("skipped", "2024-06-01", Some(Judgment::Yes), None));

    let summaries = summarize(&records);

    let mut seen = HashSet::new();
    for summary in &summaries {
        assert_eq!(summary.total() as u32, summary.counts.total());
        for id in summary.yes_items.iter().chain(&summary.no_items) {
            assert!(seen.insert(id.clone()), "{id} listed twice");
        }
    }
    assert_eq!(seen.len(), 60);
    assert!(!seen.contains("skipped"));
}

#[test]
fn resolved_partition_is_chronological() {
    let judged_yes = |id: &str| {
        inspection(
            id,
            "2024-06-01",
            Some(Judgment::Yes),
            Some(InspectionOutcome::Fit),
        )
    };
    let mut first = judged_yes("r1");
    first.updated_at = Some(at(11, 0));
    let mut second = judged_yes("r2");
    second.updated_at = Some(at(9, 0));
    // Never updated: falls back to the creation stamp.
    let mut third = judged_yes("r3");
    third.created_at = Some(at(10, 0));

    let inspections = by_id(vec![first, second, third]);
    let details = vec![detail("r1", "M-1"), detail("r2", "M-2"), detail("r3", "M-3")];
    let summaries = summarize(inspections.values());
    let summary = find_summary(&summaries, "2024-06-01").unwrap();

    let resolved = resolve_summary(summary, JudgmentBucket::Yes, &details, &inspections);

    let order: Vec<&str> = resolved
        .entries
        .iter()
        .map(|entry| entry.detail.id.as_str())
        .collect();
    assert_eq!(order, ["r2", "r3", "r1"]);
    assert_eq!(resolved.dropped, 0);
    assert_eq!(resolved.entries[0].detail.field("meter_no"), Some("M-2"));
}

#[test]
fn records_without_timestamps_sort_first_and_ties_keep_input_order() {
    let mut stamped = inspection("s", "2024-06-01", None, Some(InspectionOutcome::Fit));
    stamped.updated_at = Some(at(8, 0));
    let unstamped_a = inspection("u1", "2024-06-01", None, Some(InspectionOutcome::Fit));
    let unstamped_b = inspection("u2", "2024-06-01", None, Some(InspectionOutcome::Fit));
    let inspections = by_id(vec![stamped, unstamped_a, unstamped_b]);
    let details = vec![detail("s", "1"), detail("u1", "2"), detail("u2", "3")];

    let ids = vec!["s".to_string(), "u2".to_string(), "u1".to_string()];
    let resolved = resolve_partition(&ids, &details, &inspections);

    let order: Vec<&str> = resolved
        .entries
        .iter()
        .map(|entry| entry.inspection.id.as_str())
        .collect();
    assert_eq!(order, ["u2", "u1", "s"]);
}

#[test]
fn dangling_ids_are_dropped_and_counted() {
    let judged_no = |id: &str| {
        inspection(
            id,
            "2024-06-01",
            Some(Judgment::No),
            Some(InspectionOutcome::Unfit),
        )
    };
    let inspections = by_id(vec![
        judged_no("kept"),
        judged_no("orphan"),
        judged_no("also_kept"),
    ]);
    // The detail row for `orphan` was replaced by a later import.
    let details = vec![detail("kept", "1"), detail("also_kept", "2")];
    let summaries = summarize(inspections.values());
    let summary = find_summary(&summaries, "2024-06-01").unwrap();
    assert_eq!(summary.no_items.len(), 3);

    let resolved = resolve_summary(summary, JudgmentBucket::No, &details, &inspections);
    assert_eq!(resolved.entries.len(), 2);
    assert_eq!(resolved.dropped, 1);

    // Ids with a detail row but no inspection are dropped the same way.
    let ids = vec!["kept".to_string(), "missing".to_string()];
    let resolved = resolve_partition(&ids, &details, &inspections);
    assert_eq!(resolved.entries.len(), 1);
    assert_eq!(resolved.dropped, 1);
}

#[test]
fn empty_input_yields_no_summaries() {
    let none: Vec<InspectionRecord> = Vec::new();
    assert!(summarize(&none).is_empty());
}
