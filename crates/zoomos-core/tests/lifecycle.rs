//! Tests for the file status state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use zoomos_core::{
    CancellationRegistry, FileStore, InMemoryFileStore, LifecycleError, LifecycleTracker,
    StoreError,
};
use zoomos_model::{
    ClientId, FileId, FileRecord, FileStatus, ProcessingStats, ResultEnvelope, RunOutcome,
    row_from_pairs,
};

fn tracker() -> (LifecycleTracker, Arc<InMemoryFileStore>) {
    let store = Arc::new(InMemoryFileStore::new());
    let tracker = LifecycleTracker::new(store.clone(), Arc::new(CancellationRegistry::new()));
    (tracker, store)
}

fn envelope(total: u64, success: u64, errors: u64) -> ResultEnvelope {
    let stats = ProcessingStats {
        total_count: total,
        success_count: success,
        error_count: errors,
        errors: (0..errors).map(|index| format!("row {}: bad", index + 1)).collect(),
        processed_rows: vec![row_from_pairs([("a", "1")])],
        ..ProcessingStats::default()
    };
    ResultEnvelope::from_run(stats, RunOutcome::Completed, "default")
}

#[test]
fn upload_starts_pending() {
    let (tracker, _) = tracker();
    let record = tracker.register_upload(ClientId(1), "prices.csv").unwrap();

    assert_eq!(record.status, FileStatus::Pending);
    assert!(record.processing_started_at.is_none());
    assert_eq!(tracker.find(record.id).unwrap(), record);
}

#[test]
fn clean_run_completes() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();

    let record = tracker.complete(id, &envelope(10, 10, 0)).unwrap();

    assert_eq!(record.status, FileStatus::Completed);
    assert!(record.error_message.is_none());
    assert!(record.processing_completed_at.is_some());
    assert_eq!(record.processed_records, 10);
}

#[test]
fn run_with_errors_completes_with_summary() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();

    let record = tracker.complete(id, &envelope(10, 7, 3)).unwrap();

    assert_eq!(record.status, FileStatus::CompletedWithErrors);
    insta::assert_snapshot!(
        record.error_message.unwrap_or_default(),
        @"processed with errors (3 of 10 records)"
    );
    assert_eq!(record.error_records, 3);
}

#[test]
fn persisted_results_drop_rows_but_keep_counts() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();
    let record = tracker.complete(id, &envelope(10, 7, 3)).unwrap();

    let json = record.processing_results.clone().unwrap();
    assert!(!json.contains("processedRows"));
    let stats = record.results().unwrap().unwrap();
    assert_eq!(stats.total_count, 10);
    assert_eq!(stats.error_count, 3);
    assert_eq!(stats.errors.len(), 3);
}

#[test]
fn failed_run_records_error_message() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();
    let failed = ResultEnvelope::from_run(
        ProcessingStats::default(),
        RunOutcome::Failed {
            message: "stage 'task-filter' failed".to_string(),
        },
        "task-filter",
    );

    let record = tracker.complete(id, &failed).unwrap();

    assert_eq!(record.status, FileStatus::Error);
    assert_eq!(
        record.error_message.as_deref(),
        Some("stage 'task-filter' failed")
    );
}

#[test]
fn starting_twice_is_rejected() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    let started = tracker.start_processing(id).unwrap();

    let err = tracker.start_processing(id).unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    assert_eq!(
        tracker.find(id).unwrap().processing_started_at,
        started.processing_started_at
    );
}

#[test]
fn starting_a_terminal_record_is_rejected() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();
    tracker.complete(id, &envelope(1, 1, 0)).unwrap();

    let err = tracker.start_processing(id).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: FileStatus::Completed,
            to: FileStatus::Processing,
            ..
        }
    ));
    assert!(tracker.complete(id, &envelope(1, 1, 0)).is_err());
}

#[test]
fn cancel_raises_flag_and_is_terminal() {
    let cancellations = Arc::new(CancellationRegistry::new());
    let tracker = LifecycleTracker::new(Arc::new(InMemoryFileStore::new()), Arc::clone(&cancellations));
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();

    let record = tracker.cancel(id).unwrap();

    assert_eq!(record.status, FileStatus::Cancelled);
    assert!(cancellations.is_cancelled(id));
    assert!(tracker.cancel(id).is_err());
    assert!(tracker.mark_failed(id, "late failure").is_err());
}

#[test]
fn mark_failed_truncates_long_messages() {
    let (tracker, _) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;

    let record = tracker.mark_failed(id, &"x".repeat(5_000)).unwrap();

    assert_eq!(record.status, FileStatus::Error);
    assert_eq!(record.error_message.unwrap().len(), 1_000);
}

#[test]
fn failed_save_leaves_stored_record_untouched() {
    let (tracker, store) = tracker();
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    store.set_unavailable(true);

    let err = tracker.start_processing(id).unwrap_err();

    assert!(matches!(err, LifecycleError::Persist { .. }));
    let stored = store.find_by_id(id).unwrap().unwrap();
    assert_eq!(stored.status, FileStatus::Pending);
    assert!(stored.processing_started_at.is_none());
}

#[test]
fn unknown_record_is_not_found() {
    let (tracker, _) = tracker();
    let err = tracker.start_processing(zoomos_model::FileId(77)).unwrap_err();
    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[test]
fn cancelling_a_pending_file_leaves_no_flag_behind() {
    let cancellations = Arc::new(CancellationRegistry::new());
    let tracker = LifecycleTracker::new(Arc::new(InMemoryFileStore::new()), Arc::clone(&cancellations));
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;

    let record = tracker.cancel(id).unwrap();

    assert_eq!(record.status, FileStatus::Cancelled);
    assert!(cancellations.is_empty());
    assert!(tracker.start_processing(id).is_err());
}

/// Store whose reads stall once armed, widening the window between a
/// transition's read and its save.
struct SlowReadStore {
    inner: InMemoryFileStore,
    slow: AtomicBool,
}

impl FileStore for SlowReadStore {
    fn allocate_id(&self) -> Result<FileId, StoreError> {
        self.inner.allocate_id()
    }

    fn save(&self, record: &FileRecord) -> Result<(), StoreError> {
        self.inner.save(record)
    }

    fn find_by_id(&self, id: FileId) -> Result<Option<FileRecord>, StoreError> {
        let found = self.inner.find_by_id(id);
        if self.slow.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(50));
        }
        found
    }
}

#[test]
fn racing_cancel_and_complete_accept_only_one_terminal_status() {
    let store = Arc::new(SlowReadStore {
        inner: InMemoryFileStore::new(),
        slow: AtomicBool::new(false),
    });
    let tracker = Arc::new(LifecycleTracker::new(
        store.clone(),
        Arc::new(CancellationRegistry::new()),
    ));
    let id = tracker.register_upload(ClientId(1), "a.csv").unwrap().id;
    tracker.start_processing(id).unwrap();
    store.slow.store(true, Ordering::SeqCst);

    let start = Arc::new(Barrier::new(2));
    let cancel = {
        let (tracker, start) = (Arc::clone(&tracker), Arc::clone(&start));
        thread::spawn(move || {
            start.wait();
            tracker.cancel(id)
        })
    };
    let complete = {
        let (tracker, start) = (Arc::clone(&tracker), Arc::clone(&start));
        thread::spawn(move || {
            start.wait();
            tracker.complete(id, &envelope(2, 2, 0))
        })
    };
    let results = [cancel.join().unwrap(), complete.join().unwrap()];

    let accepted: Vec<&FileRecord> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
    assert_eq!(accepted.len(), 1);
    let rejected = results.iter().find_map(|result| result.as_ref().err()).unwrap();
    assert!(matches!(rejected, LifecycleError::InvalidTransition { .. }));
    store.slow.store(false, Ordering::SeqCst);
    assert_eq!(tracker.find(id).unwrap().status, accepted[0].status);
}
