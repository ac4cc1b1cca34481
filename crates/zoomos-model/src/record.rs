//! Persistent record of an uploaded file and its processing attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ClientId, FileId};
use crate::stats::ProcessingStats;
use crate::status::FileStatus;

/// Maximum stored length of `FileRecord::error_message`, in characters.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub client_id: ClientId,
    pub original_filename: String,
    pub status: FileStatus,
    pub uploaded_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// JSON statistics snapshot of the last run, without row payload.
    pub processing_results: Option<String>,
    pub processed_records: u64,
    pub success_records: u64,
    pub error_records: u64,
}

impl FileRecord {
    /// A freshly uploaded file, waiting in `PENDING`.
    pub fn pending(
        id: FileId,
        client_id: ClientId,
        original_filename: impl Into<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_id,
            original_filename: original_filename.into(),
            status: FileStatus::Pending,
            uploaded_at,
            processing_started_at: None,
            processing_completed_at: None,
            error_message: None,
            processing_results: None,
            processed_records: 0,
            success_records: 0,
            error_records: 0,
        }
    }

    /// Store `message`, truncated to [`ERROR_MESSAGE_MAX_CHARS`].
    pub fn set_error_message(&mut self, message: &str) {
        self.error_message = Some(truncate_chars(message, ERROR_MESSAGE_MAX_CHARS));
    }

    /// Copy counters from a run's statistics.
    pub fn apply_counts(&mut self, stats: &ProcessingStats) {
        self.processed_records = stats.total_count;
        self.success_records = stats.success_count;
        self.error_records = stats.error_count;
    }

    /// Statistics of the last run, if a snapshot was stored.
    pub fn results(&self) -> Option<crate::Result<ProcessingStats>> {
        self.processing_results
            .as_deref()
            .map(ProcessingStats::from_persisted_snapshot)
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
