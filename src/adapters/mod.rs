//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Readers: PSE reports and weather exports
//! - Storage: curated CSV files and the dataset bundle
//! - HTTP: raw report downloads
//! - Plotting: actuals vs forecast charts
//! - CLI: Command-line interface handlers

pub mod readers;
pub mod storage;
pub mod http;
pub mod plotting;
pub mod cli;

pub use readers::{reader_for, PseReader, WeatherReader};
pub use storage::{CsvUploader, DatasetBundle};
pub use http::HttpDownloader;
pub use cli::CliApp;
