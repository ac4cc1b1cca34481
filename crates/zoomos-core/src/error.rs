//! Error types for the processing pipeline and the file lifecycle.

use thiserror::Error;
use zoomos_model::{FileId, FileStatus, ModelError};

/// Errors that abort a chain before or while it runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Strategy parameters failed validation; no row was touched.
    #[error("invalid configuration for stage '{stage}': {message}")]
    Configuration { stage: String, message: String },

    /// A stage hit a structural failure.
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: StageFailure,
    },

    /// The run's cancellation flag was observed between stages.
    #[error("run cancelled before stage '{next_stage}'")]
    Cancelled { next_stage: String },

    /// Rendering the export artifact failed.
    #[error("failed to export processed rows: {0}")]
    Export(#[from] csv::Error),
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Fatal failure of a single stage.
#[derive(Debug, Error)]
pub enum StageFailure {
    /// Stage-level configuration that can only be checked once the stage runs.
    #[error("{0}")]
    Configuration(String),

    /// Required reference data could not be loaded.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A batch worker panicked.
    #[error("batch worker panicked while processing rows {start}..{end}")]
    WorkerPanicked { start: usize, end: usize },
}

/// Errors returned by a reference directory.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error("reference directory unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by a file store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file record store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the file lifecycle tracker.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("file record {0} not found")]
    NotFound(FileId),

    #[error("file record {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: FileId,
        from: FileStatus,
        to: FileStatus,
    },

    #[error("failed to allocate a file record id: {0}")]
    Allocate(#[source] StoreError),

    #[error("failed to persist file record {id}: {source}")]
    Persist {
        id: FileId,
        #[source]
        source: StoreError,
    },

    #[error("failed to serialize statistics for file record {id}: {source}")]
    Snapshot {
        id: FileId,
        #[source]
        source: ModelError,
    },
}

/// Result alias for pipeline operations.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
