//! End-to-end tests for third-party attribution and ranking.
//!
//! Covers:
//! 1. Row totals matching the summary
//! 2. One row per entity
//! 3. Ordering by combined impact
//! 4. Skipping of unresolvable URLs
//! 5. CPU multiplier scaling and record/task merging

use proptest::prelude::*;
use std::collections::HashSet;
use tpaudit::entities::EntityDatabase;
use tpaudit::models::{ExecutionTask, TransferRecord};
use tpaudit::third_party_summary;

const URL_POOL: &[&str] = &[
    "https://www.google-analytics.com/analytics.js",
    "https://ssl.google-analytics.com/ga.js",
    "https://www.googletagmanager.com/gtm.js",
    "https://cdn.jsdelivr.net/npm/lib@1/dist/lib.min.js",
    "https://connect.facebook.net/en_US/fbevents.js",
    "https://first-party.example/app.js",
    "not a url",
    "",
    "about:blank",
    "Browser",
    "data:text/javascript,1",
];

fn database() -> EntityDatabase {
    EntityDatabase::embedded().unwrap()
}

fn record_strategy() -> impl Strategy<Value = TransferRecord> {
    (0..URL_POOL.len(), 0u64..2_000_000, any::<bool>()).prop_map(|(i, size, script)| {
        if script {
            TransferRecord::script(URL_POOL[i], size)
        } else {
            TransferRecord::new(URL_POOL[i], size)
        }
    })
}

fn task_strategy() -> impl Strategy<Value = ExecutionTask> {
    (
        prop::collection::vec(0..URL_POOL.len(), 0..3),
        0u32..5_000,
    )
        .prop_map(|(urls, self_time)| {
            ExecutionTask::new(
                self_time as f64,
                urls.into_iter().map(|i| URL_POOL[i].to_string()).collect(),
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_rows_sum_to_summary(
        records in prop::collection::vec(record_strategy(), 0..40),
        tasks in prop::collection::vec(task_strategy(), 0..40),
        multiplier in prop::sample::select(vec![1.0, 2.0, 4.0]),
    ) {
        let audit = third_party_summary(&records, &tasks, multiplier, &database());
        let rows = &audit.details.items;
        let summary = audit.details.summary;

        let bytes = rows.iter().fold(0u64, |acc, r| acc.saturating_add(r.transfer_size));
        let ms: f64 = rows.iter().map(|r| r.main_thread_time).sum();
        prop_assert_eq!(bytes, summary.wasted_bytes);
        prop_assert!((ms - summary.wasted_ms).abs() < 1e-6);
    }

    #[test]
    fn prop_entities_unique_and_sorted(
        records in prop::collection::vec(record_strategy(), 0..40),
        tasks in prop::collection::vec(task_strategy(), 0..40),
    ) {
        let audit = third_party_summary(&records, &tasks, 1.0, &database());
        let rows = &audit.details.items;

        let ids: HashSet<_> = rows.iter().map(|r| r.entity_id.clone()).collect();
        prop_assert_eq!(ids.len(), rows.len());

        for pair in rows.windows(2) {
            prop_assert!(pair[0].score() >= pair[1].score());
        }
    }

    #[test]
    fn prop_score_reflects_emptiness(
        records in prop::collection::vec(record_strategy(), 0..10),
        tasks in prop::collection::vec(task_strategy(), 0..10),
    ) {
        let audit = third_party_summary(&records, &tasks, 1.0, &database());
        let expected = if audit.details.items.is_empty() { 1.0 } else { 0.0 };
        prop_assert_eq!(audit.score, expected);
    }
}

#[test]
fn test_empty_inputs() {
    let audit = third_party_summary(&[], &[], 1.0, &database());
    assert!(audit.details.items.is_empty());
    assert_eq!(audit.details.summary.wasted_bytes, 0);
    assert_eq!(audit.details.summary.wasted_ms, 0.0);
    assert_eq!(audit.score, 1.0);
}

#[test]
fn test_unresolvable_record_contributes_nothing() {
    let records = vec![TransferRecord::new("not a url", 500)];
    let audit = third_party_summary(&records, &[], 1.0, &database());
    assert!(audit.details.items.is_empty());
    assert_eq!(audit.details.summary.wasted_bytes, 0);
    assert_eq!(audit.score, 1.0);
}

#[test]
fn test_cpu_multiplier_scaling() {
    let url = "https://www.googletagmanager.com/gtm.js";
    let tasks = vec![ExecutionTask::new(100.0, vec![url.to_string()])];

    let throttled = third_party_summary(&[], &tasks, 4.0, &database());
    assert_eq!(throttled.details.items[0].main_thread_time, 400.0);

    let unthrottled = third_party_summary(&[], &tasks, 1.0, &database());
    assert_eq!(unthrottled.details.items[0].main_thread_time, 100.0);
}

#[test]
fn test_records_and_task_merge_into_one_row() {
    let records = vec![
        TransferRecord::script("https://www.google-analytics.com/analytics.js", 100),
        TransferRecord::new("https://ssl.google-analytics.com/collect?v=1", 200),
    ];
    let tasks = vec![ExecutionTask::new(
        50.0,
        vec!["https://www.google-analytics.com/analytics.js".to_string()],
    )];

    let audit = third_party_summary(&records, &tasks, 1.0, &database());
    let rows = &audit.details.items;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity, "Google Analytics");
    assert_eq!(rows[0].transfer_size, 300);
    assert_eq!(rows[0].main_thread_time, 50.0);
    assert_eq!(audit.score, 0.0);
}

#[test]
fn test_oversized_transfer_does_not_abort() {
    let records = vec![
        TransferRecord::new("https://www.googletagmanager.com/gtm.js", u64::MAX),
        TransferRecord::new("https://www.googletagmanager.com/gtag/js", 1),
    ];
    let audit = third_party_summary(&records, &[], 1.0, &database());
    let rows = &audit.details.items;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].transfer_size, u64::MAX);
    assert_eq!(audit.details.summary.wasted_bytes, u64::MAX);
}
