//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Raw source readers (PSE reports, weather exports)
//! - Curated storage
//! - Raw report downloads
//! - Feature transformers, forecasters and splitters

pub mod reader;
pub mod storage;
pub mod downloader;
pub mod modeling;

pub use reader::{ReadError, SourceReader, TIME_FORMAT};
pub use storage::{Storage, StorageError, UploadSummary};
pub use downloader::{DownloadError, Downloader};
pub use modeling::{
    ForecastError, Forecaster, SplitError, Splitter, TransformError, Transformer, Window,
};

#[cfg(test)]
pub use modeling::MockForecaster;
