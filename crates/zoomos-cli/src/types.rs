use std::path::PathBuf;

use zoomos_model::{FileId, FileStatus, ProcessingStats};

#[derive(Debug)]
pub struct ProcessResult {
    pub client_id: u64,
    pub files: Vec<FileSummary>,
    pub totals: ProcessingStats,
    pub has_errors: bool,
}

#[derive(Debug)]
pub struct FileSummary {
    pub id: Option<FileId>,
    pub path: PathBuf,
    pub chain: String,
    pub status: FileStatus,
    pub stats: ProcessingStats,
    pub message: Option<String>,
    pub export: Option<PathBuf>,
}
