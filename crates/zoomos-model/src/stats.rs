//! Processing statistics for one run and their cross-run combination.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::row::Row;

/// Immutable statistics snapshot of a processing run.
///
/// `success_count + error_count <= total_count` is expected but not enforced:
/// redaction stages count modified rows as successes while the orchestrator
/// owns `total_count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub total_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub processing_time_seconds: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub error_types: BTreeMap<String, u64>,
    #[serde(default)]
    pub additional_stats: BTreeMap<String, Value>,
    /// Row payload of the run. Never persisted.
    #[serde(skip)]
    pub processed_rows: Vec<Row>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine independently computed snapshots into one.
    ///
    /// Counts and times are summed, error lists and row payloads concatenated
    /// in argument order, per-type error counts summed, and additional stats
    /// unioned with later values winning on key collision.
    pub fn merge<'a, I>(stats: I) -> Self
    where
        I: IntoIterator<Item = &'a ProcessingStats>,
    {
        let mut merged = Self::new();
        for stat in stats {
            merged.total_count += stat.total_count;
            merged.success_count += stat.success_count;
            merged.error_count += stat.error_count;
            merged.processing_time_seconds += stat.processing_time_seconds;
            merged.errors.extend(stat.errors.iter().cloned());
            for (kind, count) in &stat.error_types {
                *merged.error_types.entry(kind.clone()).or_insert(0) += count;
            }
            for (key, value) in &stat.additional_stats {
                merged.additional_stats.insert(key.clone(), value.clone());
            }
            merged
                .processed_rows
                .extend(stat.processed_rows.iter().cloned());
        }
        merged
    }

    /// Percentage of rows counted as successful (0 when nothing was counted).
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_count as f64 * 100.0
    }

    /// Percentage of rows that produced an error (0 when nothing was counted).
    pub fn error_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.total_count as f64 * 100.0
    }

    /// Rows per second (0 when the run took less than a second).
    pub fn processing_speed(&self) -> f64 {
        if self.processing_time_seconds == 0 {
            return 0.0;
        }
        self.total_count as f64 / self.processing_time_seconds as f64
    }

    /// Whether the counters satisfy `success + error <= total`.
    pub fn counts_are_consistent(&self) -> bool {
        self.success_count.saturating_add(self.error_count) <= self.total_count
    }

    /// JSON snapshot stored next to a file record. The row payload is dropped.
    pub fn persisted_snapshot(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_persisted_snapshot(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
