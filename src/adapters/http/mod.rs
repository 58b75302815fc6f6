//! HTTP adapter for raw report downloads

pub mod client;

pub use client::{DownloaderConfig, HttpDownloader};
