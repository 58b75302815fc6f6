//! HTTP Report Downloader
//!
//! Fetches raw report files (e.g. PSE CSV exports) and writes them to the
//! raw data folder. Transient failures are retried with backoff.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;

use crate::ports::{DownloadError, Downloader};

/// Downloader configuration
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Number of attempts before giving up
    pub max_retries: u32,
    /// Base delay between attempts
    pub backoff: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            DownloadError::InvalidUrl(err.to_string())
        } else if err.is_timeout() {
            DownloadError::Timeout
        } else if err.is_connect() {
            DownloadError::NetworkError(err.to_string())
        } else {
            DownloadError::HttpError(err.to_string())
        }
    }
}

/// reqwest-backed downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    config: DownloaderConfig,
    http: Client,
}

impl HttpDownloader {
    /// Create a downloader with default configuration
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_config(DownloaderConfig::default())
    }

    /// Create a downloader with custom configuration
    pub fn with_config(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("powercast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DownloadError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Fetch a URL body, retrying transient failures
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() => {
                    if attempt + 1 == self.config.max_retries {
                        last_error = Some(e);
                        break;
                    }
                    let backoff = match e {
                        DownloadError::RateLimited => Duration::from_secs(2u64.pow(attempt + 1)),
                        _ => self.config.backoff * (attempt + 1),
                    };
                    tracing::warn!(
                        "Download of {} failed: {} - retrying in {:?} (attempt {}/{})",
                        url,
                        e,
                        backoff,
                        attempt + 1,
                        self.config.max_retries
                    );
                    last_error = Some(e);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(DownloadError::MaxRetriesExceeded {
            attempts: self.config.max_retries,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DownloadError::RateLimited);
        }
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let body = self.fetch(url).await?;

        let write_error = |e: std::io::Error| DownloadError::WriteError {
            path: dest.display().to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        tokio::fs::write(dest, &body).await.map_err(write_error)?;

        tracing::info!("Downloaded {} bytes from {} to {}", body.len(), url, dest.display());
        Ok(body.len() as u64)
    }
}
