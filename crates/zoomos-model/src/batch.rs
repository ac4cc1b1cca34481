//! Batch sizes published to the row-reading and persistence collaborators.

/// Rows read from a source file per batch.
pub const BATCH_SIZE_FILE_RECORD: usize = 10_000;

/// Rows written to storage per batch.
pub const BATCH_SIZE_DATA_SAVE: usize = 5_000;
