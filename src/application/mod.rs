//! Application Layer - Workflows
//!
//! - `ingestion`: raw files into the curated bundle
//! - `modeling`: features and backtests over the curated bundle
//! - `recorder`: saving forecasts, errors and plots

pub mod ingestion;
pub mod modeling;
pub mod recorder;

pub use ingestion::{
    check_file, fetch_source, ingest_file, raw_destination, run_ingestion, source_url, CheckReport,
    IngestionReport,
};
pub use modeling::{
    build_models, build_pipeline, run_backtest, BacktestOverrides, BacktestReport,
};
pub use recorder::{RecordError, RecordedPaths, ResultRecorder, STAMP_FORMAT};
