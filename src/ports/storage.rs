use thiserror::Error;

use crate::domain::{CheckError, Frame};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File must be of {expected} format, got '{path}'")]
    InvalidExtension { expected: &'static str, path: String },

    #[error("Failed to access storage: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stored data: {0}")]
    Parse(String),

    #[error("Stored data is invalid: {0}")]
    Invalid(#[from] CheckError),
}

/// Outcome of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub existing_rows: usize,
    pub appended_rows: usize,
    pub total_rows: usize,
}

/// Append-only storage of a time-indexed frame
pub trait Storage {
    /// Read everything stored so far
    fn read(&self) -> Result<Frame, StorageError>;

    /// Merge new rows into storage; rows with an existing timestamp are skipped
    fn upload(&self, data: &Frame) -> Result<UploadSummary, StorageError>;

    /// Whether anything has been stored yet
    fn exists(&self) -> bool;
}
