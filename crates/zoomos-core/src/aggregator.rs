//! Thread-safe statistics collection for a single run.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use zoomos_model::{ProcessingStats, Row};

/// Mutable counters for one processing run.
///
/// All updates go through one mutex, so increments from batch workers
/// operating on disjoint row subsets never interleave. Cross-run
/// combination happens only through [`ProcessingStats::merge`] on snapshots.
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    inner: Mutex<ProcessingStats>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProcessingStats> {
        // A panicking worker cannot leave the counters half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn increment_success(&self) {
        self.lock().success_count += 1;
    }

    pub fn increment_success_by(&self, count: u64) {
        self.lock().success_count += count;
    }

    /// Count one error, keeping its message and bumping the per-type counter.
    pub fn increment_error(&self, message: impl Into<String>, error_type: &str) {
        let mut stats = self.lock();
        stats.error_count += 1;
        stats.errors.push(message.into());
        *stats.error_types.entry(error_type.to_string()).or_insert(0) += 1;
    }

    /// Count an error for the row at zero-based `index`, reported as `row N: message`
    /// with a one-based `N`.
    pub fn record_row_error(&self, index: usize, message: &str, error_type: &str) {
        self.increment_error(format!("row {}: {message}", index + 1), error_type);
    }

    pub fn add_total(&self, count: u64) {
        self.lock().total_count += count;
    }

    pub fn set_additional_stat(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.lock()
            .additional_stats
            .insert(key.into(), value.into());
    }

    pub fn success_count(&self) -> u64 {
        self.lock().success_count
    }

    pub fn error_count(&self) -> u64 {
        self.lock().error_count
    }

    /// Copy of the current counters, without row payload.
    pub fn snapshot(&self) -> ProcessingStats {
        let stats = self.lock();
        ProcessingStats {
            processed_rows: Vec::new(),
            ..stats.clone()
        }
    }

    /// Close the run: stamp its duration and attach the processed rows.
    pub fn finish(self, elapsed: Duration, rows: Vec<Row>) -> ProcessingStats {
        let mut stats = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        stats.processing_time_seconds = elapsed.as_secs();
        stats.processed_rows = rows;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_errors_are_numbered_from_one() {
        let aggregator = StatisticsAggregator::new();
        aggregator.record_row_error(0, "bad date", "date_parse");
        aggregator.record_row_error(4, "bad date", "date_parse");

        let stats = aggregator.snapshot();
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.errors, vec!["row 1: bad date", "row 5: bad date"]);
        assert_eq!(stats.error_types.get("date_parse"), Some(&2));
    }

    #[test]
    fn finish_stamps_whole_seconds() {
        let aggregator = StatisticsAggregator::new();
        aggregator.add_total(3);
        let stats = aggregator.finish(Duration::from_millis(2_750), Vec::new());
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.processing_time_seconds, 2);
    }
}
