use crate::JobId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("corpus is empty; load or fit jobs first")]
    EmptyCorpus,
    #[error("job {0} not found in corpus")]
    NotFound(JobId),
    #[error("vectorizer used before fit")]
    NotFitted,
    #[error("invalid job record: {0}")]
    InvalidJob(String),
    #[error("duplicate job id {0}")]
    DuplicateJob(JobId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to load model from {}: {reason}", .path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("failed to save model to {}: {reason}", .path.display())]
    ModelSave { path: PathBuf, reason: String },
    #[error("upstream data error: {0}")]
    UpstreamData(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<sled::Error> for CoreError {
    fn from(value: sled::Error) -> Self {
        CoreError::UpstreamData(value.to_string())
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
