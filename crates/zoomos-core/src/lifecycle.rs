//! File status state machine.
//!
//! `PENDING -> PROCESSING -> {COMPLETED, COMPLETED_WITH_ERRORS, ERROR, CANCELLED}`.
//! Every transition is persisted through the [`FileStore`]; a record whose
//! save fails keeps its previously stored state. Transitions are serialized,
//! so of two racing terminal transitions only the first is accepted.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{info, warn};
use zoomos_model::{ClientId, FileId, FileRecord, FileStatus, ResultEnvelope, RunOutcome};

use crate::cancel::CancellationRegistry;
use crate::error::LifecycleError;
use crate::store::FileStore;

type Result<T> = std::result::Result<T, LifecycleError>;

pub struct LifecycleTracker {
    store: Arc<dyn FileStore>,
    cancellations: Arc<CancellationRegistry>,
    /// Held across find, check and save of every transition.
    transitions: Mutex<()>,
}

impl LifecycleTracker {
    pub fn new(store: Arc<dyn FileStore>, cancellations: Arc<CancellationRegistry>) -> Self {
        Self {
            store,
            cancellations,
            transitions: Mutex::new(()),
        }
    }

    pub fn cancellations(&self) -> &Arc<CancellationRegistry> {
        &self.cancellations
    }

    pub fn find(&self, id: FileId) -> Result<FileRecord> {
        self.store
            .find_by_id(id)
            .map_err(|source| LifecycleError::Persist { id, source })?
            .ok_or(LifecycleError::NotFound(id))
    }

    /// Create a `PENDING` record for an uploaded file.
    pub fn register_upload(
        &self,
        client_id: ClientId,
        original_filename: &str,
    ) -> Result<FileRecord> {
        let id = self.store.allocate_id().map_err(LifecycleError::Allocate)?;
        let record = FileRecord::pending(id, client_id, original_filename, Utc::now());
        self.persist(&record)?;
        info!(file_id = %id, client_id = %client_id, file = original_filename, "upload registered");
        Ok(record)
    }

    /// Move a `PENDING` record to `PROCESSING`.
    ///
    /// A record already processing or in a terminal status is rejected, so
    /// the start timestamp is written once.
    pub fn start_processing(&self, id: FileId) -> Result<FileRecord> {
        self.transition(id, FileStatus::Processing, |record| {
            record.processing_started_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Apply the outcome of a run to its record.
    pub fn complete(&self, id: FileId, envelope: &ResultEnvelope) -> Result<FileRecord> {
        let (status, message) = status_for(envelope);
        let record = self.transition(id, status, |record| {
            record.processing_completed_at = Some(Utc::now());
            record.apply_counts(&envelope.stats);
            record.processing_results = Some(
                envelope
                    .stats
                    .persisted_snapshot()
                    .map_err(|source| LifecycleError::Snapshot { id, source })?,
            );
            match &message {
                Some(message) => record.set_error_message(message),
                None => record.error_message = None,
            }
            Ok(())
        })?;
        info!(
            file_id = %id,
            status = %record.status,
            processed = record.processed_records,
            errors = record.error_records,
            "file processing finished"
        );
        Ok(record)
    }

    /// Record an unrecoverable failure raised outside a run (e.g. unreadable upload).
    pub fn mark_failed(&self, id: FileId, message: &str) -> Result<FileRecord> {
        let record = self.transition(id, FileStatus::Error, |record| {
            record.processing_completed_at = Some(Utc::now());
            record.set_error_message(message);
            Ok(())
        })?;
        warn!(file_id = %id, error = message, "file processing failed");
        Ok(record)
    }

    /// Cancel a pending or running file.
    ///
    /// A running file gets its cancellation flag raised; a pending one never
    /// reaches a chain, so its flag is dropped instead.
    pub fn cancel(&self, id: FileId) -> Result<FileRecord> {
        let record = self.transition(id, FileStatus::Cancelled, |record| {
            record.processing_completed_at = Some(Utc::now());
            record.error_message = None;
            Ok(())
        })?;
        info!(file_id = %id, "file processing cancelled");
        Ok(record)
    }

    /// Cancellation flags are updated under the same lock, after the save.
    fn transition<F>(&self, id: FileId, to: FileStatus, update: F) -> Result<FileRecord>
    where
        F: FnOnce(&mut FileRecord) -> Result<()>,
    {
        let _serialized = self
            .transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut record = self.find(id)?;
        if !record.status.can_transition_to(to) {
            return Err(LifecycleError::InvalidTransition {
                id,
                from: record.status,
                to,
            });
        }
        let from = record.status;
        record.status = to;
        update(&mut record)?;
        self.persist(&record)?;
        match to {
            FileStatus::Cancelled if from == FileStatus::Processing => self.cancellations.cancel(id),
            status if status.is_terminal() => self.cancellations.clear(id),
            _ => {}
        }
        Ok(record)
    }

    fn persist(&self, record: &FileRecord) -> Result<()> {
        self.store
            .save(record)
            .map_err(|source| LifecycleError::Persist {
                id: record.id,
                source,
            })
    }
}

/// Terminal status and stored message for a run's envelope.
pub fn status_for(envelope: &ResultEnvelope) -> (FileStatus, Option<String>) {
    match &envelope.outcome {
        RunOutcome::Completed if envelope.stats.error_count == 0 => (FileStatus::Completed, None),
        RunOutcome::Completed => (
            FileStatus::CompletedWithErrors,
            Some(format!(
                "processed with errors ({} of {} records)",
                envelope.stats.error_count, envelope.stats.total_count
            )),
        ),
        RunOutcome::Rejected { .. } => (FileStatus::Error, Some(envelope.errors.join("; "))),
        RunOutcome::Failed { message } => (FileStatus::Error, Some(message.clone())),
        RunOutcome::Cancelled => (FileStatus::Cancelled, None),
    }
}
