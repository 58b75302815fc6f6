//! powercast - Electricity Price Forecasting Library
//!
//! Curates raw PSE market reports and weather exports into a dataset bundle,
//! derives calendar features and backtests naive forecasters.
//!
//! # Modules
//!
//! - `domain`: Core data types (Frame, TimeSeries, Source, Manifest)
//! - `ports`: Trait abstractions (SourceReader, Storage, Downloader, Forecaster)
//! - `adapters`: External implementations (readers, CSV storage, HTTP, plots, CLI)
//! - `modeling`: Transformers, splitters, forecasters, metrics and backtesting
//! - `config`: Configuration loading and validation
//! - `application`: Ingestion and modeling workflows

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod modeling;
pub mod config;
pub mod application;
