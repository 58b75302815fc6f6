use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while fetching raw reports
#[derive(Error, Debug, Clone)]
pub enum DownloadError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// URL could not be turned into a request
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-success status from the server
    #[error("Server returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Network/connection error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Writing the downloaded file failed
    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },

    /// Maximum retries exceeded
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl DownloadError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpError(_)
            | DownloadError::Timeout
            | DownloadError::NetworkError(_)
            | DownloadError::RateLimited => true,
            DownloadError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Fetches raw report files
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}
