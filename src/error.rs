use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source database not found at {0:?}, is the e-reader connected?")]
    SourceUnavailable(PathBuf),
    #[error("invalid date format: {0:?}")]
    InvalidDateFormat(String),
}
