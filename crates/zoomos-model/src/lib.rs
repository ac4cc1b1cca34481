//! Data model shared by the processing pipeline and its collaborators.
//!
//! Nothing in this crate performs I/O. The pipeline crate owns behaviour; the
//! types here only describe what flows between the stages, the orchestrator
//! and the lifecycle tracker.

pub mod batch;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod parameters;
pub mod record;
pub mod row;
pub mod stats;
pub mod status;

pub use batch::{BATCH_SIZE_DATA_SAVE, BATCH_SIZE_FILE_RECORD};
pub use config::{ClientIdentity, RunConfiguration, StrategyKind};
pub use envelope::{ExportArtifact, ResultEnvelope, RunOutcome};
pub use error::{ModelError, Result};
pub use ids::{ClientId, FileId};
pub use parameters::{ParameterDescriptor, ParameterKind};
pub use record::{ERROR_MESSAGE_MAX_CHARS, FileRecord};
pub use row::{Row, row_from_pairs};
pub use stats::ProcessingStats;
pub use status::FileStatus;
