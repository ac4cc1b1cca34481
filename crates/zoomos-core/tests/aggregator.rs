//! Tests for concurrent statistics collection.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use zoomos_core::StatisticsAggregator;
use zoomos_model::{ProcessingStats, row_from_pairs};

#[test]
fn concurrent_success_increments_are_not_lost() {
    const THREADS: usize = 8;
    const PER_THREAD: u64 = 1_000;

    let aggregator = Arc::new(StatisticsAggregator::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    aggregator.increment_success();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(aggregator.success_count(), THREADS as u64 * PER_THREAD);
}

#[test]
fn concurrent_errors_keep_messages_and_types_in_step() {
    let aggregator = StatisticsAggregator::new();
    thread::scope(|scope| {
        for worker in 0..4 {
            let aggregator = &aggregator;
            scope.spawn(move || {
                for row in 0..250 {
                    aggregator.record_row_error(worker * 250 + row, "bad value", "parse");
                }
            });
        }
    });

    let stats = aggregator.snapshot();
    assert_eq!(stats.error_count, 1_000);
    assert_eq!(stats.errors.len(), 1_000);
    assert_eq!(stats.error_types.get("parse"), Some(&1_000));
}

#[test]
fn finished_runs_merge_into_totals() {
    let first = StatisticsAggregator::new();
    first.add_total(3);
    first.increment_success_by(2);
    first.increment_error("row 3: missing value", "missing");
    let first = first.finish(Duration::from_secs(1), vec![row_from_pairs([("a", "1")])]);

    let second = StatisticsAggregator::new();
    second.add_total(2);
    second.increment_success_by(2);
    second.set_additional_stat("chain", "default");
    let second = second.finish(Duration::from_secs(3), vec![row_from_pairs([("a", "2")])]);

    let merged = ProcessingStats::merge([&first, &second]);
    assert_eq!(merged.total_count, 5);
    assert_eq!(merged.success_count, 4);
    assert_eq!(merged.error_count, 1);
    assert_eq!(merged.processing_time_seconds, 4);
    assert_eq!(merged.processed_rows.len(), 2);
    assert_eq!(merged.success_rate(), 80.0);
    assert!(merged.counts_are_consistent());
}
