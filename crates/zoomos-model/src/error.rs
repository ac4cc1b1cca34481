use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown file status: {0}")]
    UnknownStatus(String),
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("invalid statistics snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
