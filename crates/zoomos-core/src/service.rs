//! Concurrent processing of uploaded files.

use std::io;
use std::sync::Arc;

use crossbeam_channel::{Receiver, bounded};
use tracing::{error, warn};
use zoomos_model::{FileId, FileRecord, ResultEnvelope, Row, RunConfiguration};

use crate::cancel::CancellationRegistry;
use crate::error::LifecycleError;
use crate::lifecycle::LifecycleTracker;
use crate::orchestrator::Orchestrator;
use crate::pool::{PoolConfig, Submission, WorkerPool};
use crate::registry::StrategyRegistry;
use crate::store::FileStore;

/// Result of one file's run.
#[derive(Debug)]
pub struct ProcessedFile {
    pub id: FileId,
    pub envelope: ResultEnvelope,
    /// Record after the run, or the reason its status could not be applied
    /// (e.g. it was cancelled while running).
    pub record: Result<FileRecord, LifecycleError>,
}

/// Handle to a submitted file.
#[derive(Debug)]
pub struct FileTicket {
    pub id: FileId,
    pub submission: Submission,
    result: Receiver<ProcessedFile>,
}

impl FileTicket {
    /// Block until the file's run finishes. `None` if the job was lost (panicked).
    pub fn wait(self) -> Option<ProcessedFile> {
        self.result.recv().ok()
    }
}

/// Tracker, orchestrator and worker pool wired together.
///
/// Each file runs synchronously inside one worker; different files run
/// concurrently.
pub struct FileProcessingService {
    tracker: Arc<LifecycleTracker>,
    orchestrator: Arc<Orchestrator>,
    pool: WorkerPool,
}

impl FileProcessingService {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        store: Arc<dyn FileStore>,
        pool_config: PoolConfig,
    ) -> io::Result<Self> {
        let cancellations = Arc::new(CancellationRegistry::new());
        let tracker = Arc::new(LifecycleTracker::new(store, Arc::clone(&cancellations)));
        let orchestrator = Arc::new(Orchestrator::with_cancellations(registry, cancellations));
        Ok(Self {
            tracker,
            orchestrator,
            pool: WorkerPool::new(pool_config)?,
        })
    }

    pub fn tracker(&self) -> &LifecycleTracker {
        &self.tracker
    }

    /// Move the file to `PROCESSING` and schedule its run.
    ///
    /// Fails without scheduling anything when the record cannot start.
    pub fn submit_file(
        &self,
        id: FileId,
        rows: Vec<Row>,
        config: RunConfiguration,
    ) -> Result<FileTicket, LifecycleError> {
        self.tracker.start_processing(id)?;
        let config = config.with_file_id(id);
        let tracker = Arc::clone(&self.tracker);
        let orchestrator = Arc::clone(&self.orchestrator);
        let (sender, result) = bounded(1);
        let submission = self.pool.submit(move || {
            let envelope = orchestrator.run(rows, &config);
            let record = tracker.complete(id, &envelope);
            match &record {
                Ok(_) => {}
                Err(err @ LifecycleError::InvalidTransition { .. }) => {
                    warn!(file_id = %id, error = %err, "run result discarded");
                }
                Err(err) => error!(file_id = %id, error = %err, "failed to record run result"),
            }
            tracker.cancellations().clear(id);
            // The ticket may have been dropped; nobody is waiting then.
            let _ = sender.send(ProcessedFile {
                id,
                envelope,
                record,
            });
        });
        Ok(FileTicket {
            id,
            submission,
            result,
        })
    }

    pub fn cancel(&self, id: FileId) -> Result<FileRecord, LifecycleError> {
        self.tracker.cancel(id)
    }

    /// Finish queued work and stop the workers.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}
