use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::json;
use zoomos_model::{
    FileStatus, ProcessingStats, ResultEnvelope, RunOutcome, StrategyKind, row_from_pairs,
};

fn stats(total: u64, success: u64, error: u64, seconds: u64) -> ProcessingStats {
    ProcessingStats {
        total_count: total,
        success_count: success,
        error_count: error,
        processing_time_seconds: seconds,
        ..ProcessingStats::default()
    }
}

#[test]
fn merge_sums_counts_and_concatenates_errors() {
    let mut first = stats(10, 7, 3, 2);
    first.errors = vec!["row 1: bad date".to_string()];
    first.error_types.insert("date".to_string(), 1);
    first.additional_stats.insert("stage".to_string(), json!("a"));
    first.processed_rows = vec![row_from_pairs([("k", "1")])];

    let mut second = stats(5, 5, 0, 1);
    second.errors = vec!["row 4: unknown".to_string()];
    second.error_types.insert("date".to_string(), 2);
    second.error_types.insert("lookup".to_string(), 1);
    second.additional_stats.insert("stage".to_string(), json!("b"));
    second.processed_rows = vec![row_from_pairs([("k", "2")])];

    let merged = ProcessingStats::merge([&first, &second]);

    assert_eq!(merged.total_count, 15);
    assert_eq!(merged.success_count, 12);
    assert_eq!(merged.error_count, 3);
    assert_eq!(merged.processing_time_seconds, 3);
    assert_eq!(merged.errors, vec!["row 1: bad date", "row 4: unknown"]);
    assert_eq!(merged.error_types.get("date"), Some(&3));
    assert_eq!(merged.error_types.get("lookup"), Some(&1));
    assert_eq!(merged.additional_stats.get("stage"), Some(&json!("b")));
    assert_eq!(merged.processed_rows.len(), 2);
}

#[test]
fn merge_of_nothing_is_empty() {
    let merged = ProcessingStats::merge(std::iter::empty());
    assert_eq!(merged, ProcessingStats::default());
}

#[test]
fn persisted_snapshot_keeps_counts_and_drops_rows() {
    let mut original = stats(10, 7, 3, 4);
    original.errors = vec!["row 2: missing key".to_string()];
    original.error_types.insert("missing".to_string(), 3);
    original.processed_rows = vec![row_from_pairs([("a", "b")])];

    let json = original.persisted_snapshot().unwrap();
    assert!(json.contains("\"totalCount\":10"));
    assert!(!json.contains("processedRows"));

    let restored = ProcessingStats::from_persisted_snapshot(&json).unwrap();
    assert_eq!(restored.total_count, 10);
    assert_eq!(restored.success_count, 7);
    assert_eq!(restored.error_count, 3);
    assert_eq!(restored.processing_time_seconds, 4);
    assert_eq!(restored.error_types, original.error_types);
    assert!(restored.processed_rows.is_empty());
}

#[test]
fn status_and_strategy_parse_from_text() {
    assert_eq!(
        "completed_with_errors".parse::<FileStatus>().unwrap(),
        FileStatus::CompletedWithErrors
    );
    assert!("DONE".parse::<FileStatus>().is_err());
    assert_eq!(
        "task-based-filter".parse::<StrategyKind>().unwrap(),
        StrategyKind::TaskBasedFilter
    );
}

#[test]
fn terminal_statuses_accept_no_transition() {
    for from in FileStatus::ALL.into_iter().filter(|status| status.is_terminal()) {
        for to in FileStatus::ALL {
            assert!(!from.can_transition_to(to), "{from} -> {to}");
        }
    }
    assert!(FileStatus::Pending.can_transition_to(FileStatus::Processing));
    assert!(!FileStatus::Processing.can_transition_to(FileStatus::Processing));
}

#[test]
fn envelope_moves_rows_out_of_stats() {
    let mut run = stats(2, 2, 0, 0);
    run.processed_rows = vec![row_from_pairs([("a", "1")]), row_from_pairs([("a", "2")])];

    let envelope = ResultEnvelope::from_run(run, RunOutcome::Completed, "default");

    assert!(envelope.success);
    assert_eq!(envelope.rows.len(), 2);
    assert!(envelope.stats.processed_rows.is_empty());
    assert_eq!(envelope.statistics.get("chain"), Some(&json!("default")));
    assert_eq!(envelope.statistics.get("totalCount"), Some(&json!(2)));
}

#[test]
fn failed_envelope_keeps_rows_and_reports_failure() {
    let mut run = stats(1, 0, 0, 0);
    run.processed_rows = vec![BTreeMap::new()];
    let outcome = RunOutcome::Failed {
        message: "task lookup failed".to_string(),
    };

    let envelope = ResultEnvelope::from_run(run, outcome, "task-filter");

    assert!(!envelope.success);
    assert_eq!(envelope.rows.len(), 1);
    assert_eq!(envelope.errors, vec!["task lookup failed"]);
}

#[test]
fn rejected_envelope_is_empty() {
    let envelope = ResultEnvelope::rejected(vec!["input contains no rows".to_string()]);
    assert!(!envelope.success);
    assert!(envelope.rows.is_empty());
    assert_eq!(envelope.stats.total_count, 0);
    assert_eq!(
        envelope.outcome,
        RunOutcome::Rejected {
            reason: "input contains no rows".to_string()
        }
    );
}

fn arb_stats() -> impl Strategy<Value = ProcessingStats> {
    (0u64..10_000, 0u64..10_000, 0u64..10_000, 0u64..1_000)
        .prop_map(|(total, success, error, seconds)| stats(total, success, error, seconds))
}

fn counts(stats: &ProcessingStats) -> (u64, u64, u64, u64) {
    (
        stats.total_count,
        stats.success_count,
        stats.error_count,
        stats.processing_time_seconds,
    )
}

proptest! {
    #[test]
    fn merge_is_commutative_on_counts(a in arb_stats(), b in arb_stats()) {
        let ab = ProcessingStats::merge([&a, &b]);
        let ba = ProcessingStats::merge([&b, &a]);
        prop_assert_eq!(counts(&ab), counts(&ba));
    }

    #[test]
    fn merge_is_associative_on_counts(a in arb_stats(), b in arb_stats(), c in arb_stats()) {
        let left = ProcessingStats::merge([&ProcessingStats::merge([&a, &b]), &c]);
        let right = ProcessingStats::merge([&a, &ProcessingStats::merge([&b, &c])]);
        let flat = ProcessingStats::merge([&a, &b, &c]);
        prop_assert_eq!(counts(&left), counts(&right));
        prop_assert_eq!(counts(&left), counts(&flat));
    }
}
