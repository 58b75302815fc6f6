//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    BacktestSection, Config, ConfigError, DataSection, FeaturesSection, IngestEntry,
    IngestSection, LoggingSection, load_config, DATA_DIR_ENV,
};
