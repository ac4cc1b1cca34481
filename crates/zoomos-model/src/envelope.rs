//! Result of one processing run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::row::Row;
use crate::stats::ProcessingStats;

/// How a run ended, independent of per-row errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every applicable stage ran to the end.
    Completed,
    /// Structural input validation failed; no stage ran.
    Rejected { reason: String },
    /// A configuration or stage failure aborted the chain.
    Failed { message: String },
    /// Cancellation was observed between stages.
    Cancelled,
}

/// Named byte payload produced when a run is exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the orchestrator hands back to its caller.
///
/// `success` only says whether the run produced zero errors: a failed
/// envelope may still carry processed rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub outcome: RunOutcome,
    pub rows: Vec<Row>,
    pub errors: Vec<String>,
    pub statistics: BTreeMap<String, Value>,
    pub stats: ProcessingStats,
    pub artifact: Option<ExportArtifact>,
}

impl ResultEnvelope {
    /// Envelope for a run whose chain executed; `stats.processed_rows` is moved into `rows`.
    pub fn from_run(mut stats: ProcessingStats, outcome: RunOutcome, chain: &str) -> Self {
        let rows = std::mem::take(&mut stats.processed_rows);
        let mut errors = stats.errors.clone();
        if let RunOutcome::Failed { message } = &outcome {
            errors.push(message.clone());
        }
        let success = stats.error_count == 0 && outcome == RunOutcome::Completed;
        let statistics = statistics_map(&stats, chain);
        Self {
            success,
            outcome,
            rows,
            errors,
            statistics,
            stats,
            artifact: None,
        }
    }

    /// Envelope for input that failed structural validation.
    pub fn rejected(errors: Vec<String>) -> Self {
        let reason = errors
            .first()
            .cloned()
            .unwrap_or_else(|| "input rejected".to_string());
        let stats = ProcessingStats::default();
        let statistics = statistics_map(&stats, "none");
        Self {
            success: false,
            outcome: RunOutcome::Rejected { reason },
            rows: Vec::new(),
            errors,
            statistics,
            stats,
            artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: ExportArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn error_count(&self) -> u64 {
        self.stats.error_count
    }
}

fn statistics_map(stats: &ProcessingStats, chain: &str) -> BTreeMap<String, Value> {
    let mut map: BTreeMap<String, Value> = stats
        .additional_stats
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    map.insert("chain".to_string(), json!(chain));
    map.insert("totalCount".to_string(), json!(stats.total_count));
    map.insert("successCount".to_string(), json!(stats.success_count));
    map.insert("errorCount".to_string(), json!(stats.error_count));
    map.insert(
        "processingTimeSeconds".to_string(),
        json!(stats.processing_time_seconds),
    );
    map.insert("successRate".to_string(), json!(stats.success_rate()));
    map.insert("errorRate".to_string(), json!(stats.error_rate()));
    map.insert(
        "processingSpeed".to_string(),
        json!(stats.processing_speed()),
    );
    map
}
