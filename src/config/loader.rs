//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching
//! config/powercast.toml structure.

use serde::Deserialize;
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{Frequency, Source};
use crate::modeling::forecasters::{MODEL_NAMES, SEASONAL_NAIVE_MEAN, SEASONAL_NAIVE_MEAN_3_DAYS};
use crate::modeling::metrics::{default_metrics, Metric};
use crate::modeling::splitter::{DEFAULT_FRAC, DEFAULT_STEP_LENGTH};
use crate::modeling::transformers::DEFAULT_OUTLIER_WINDOW;

/// Environment variable overriding `data.data_dir`
pub const DATA_DIR_ENV: &str = "POWERCAST_DATA_DIR";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure matching powercast.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataSection,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub features: FeaturesSection,
    pub backtest: BacktestSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Data folder layout
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    /// Root of all data folders (`~` is expanded)
    pub data_dir: String,
    #[serde(default = "default_curated_folder")]
    pub curated_folder: String,
    #[serde(default = "default_raw_folder")]
    pub raw_folder: String,
    #[serde(default = "default_results_folder")]
    pub results_folder: String,
    #[serde(default = "default_plots_folder")]
    pub plots_folder: String,
    /// Copy curated files to `<name>_copy.csv` before overwriting
    #[serde(default = "default_true")]
    pub backup: bool,
}

fn default_curated_folder() -> String {
    "CURATED".to_string()
}

fn default_raw_folder() -> String {
    "RAW".to_string()
}

fn default_results_folder() -> String {
    "RESULTS".to_string()
}

fn default_plots_folder() -> String {
    "PLOTS".to_string()
}

fn default_true() -> bool {
    true
}

impl DataSection {
    /// Data directory with `POWERCAST_DATA_DIR` override
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir_with(std::env::var(DATA_DIR_ENV).ok())
    }

    fn data_dir_with(&self, env_override: Option<String>) -> PathBuf {
        let raw = env_override
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.data_dir.clone());
        PathBuf::from(shellexpand::tilde(&raw).into_owned())
    }

    pub fn curated_dir(&self) -> PathBuf {
        self.data_dir().join(&self.curated_folder)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir().join(&self.raw_folder)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_dir().join(&self.results_folder)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.data_dir().join(&self.plots_folder)
    }

    /// Resolve a path relative to the data directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let expanded = PathBuf::from(shellexpand::tilde(path).into_owned());
        if expanded.is_absolute() {
            expanded
        } else {
            self.data_dir().join(expanded)
        }
    }
}

/// Raw files to ingest
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IngestSection {
    #[serde(default)]
    pub sources: Vec<IngestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestEntry {
    pub source: Source,
    /// Raw file, relative to the data directory
    pub file: String,
    /// Optional download location for `fetch`
    #[serde(default)]
    pub url: Option<String>,
}

/// Feature pipeline switches
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesSection {
    #[serde(default = "default_true")]
    pub interpolate: bool,
    #[serde(default)]
    pub outliers: bool,
    /// Replace outliers in `VALUE` with NaN instead of adding an `OUTLIER` flag
    #[serde(default)]
    pub replace_outliers: bool,
    #[serde(default = "default_outlier_window")]
    pub outlier_window: usize,
    #[serde(default = "default_true")]
    pub trend: bool,
    #[serde(default = "default_true")]
    pub weekend: bool,
    #[serde(default = "default_true")]
    pub day_of_week: bool,
    #[serde(default = "default_true")]
    pub season: bool,
    #[serde(default = "default_true")]
    pub day_off: bool,
    #[serde(default)]
    pub lags: Vec<usize>,
    /// Sources joined onto the target by timestamp
    #[serde(default)]
    pub exogenous: Vec<Source>,
}

fn default_outlier_window() -> usize {
    DEFAULT_OUTLIER_WINDOW
}

impl Default for FeaturesSection {
    fn default() -> Self {
        Self {
            interpolate: true,
            outliers: false,
            replace_outliers: false,
            outlier_window: DEFAULT_OUTLIER_WINDOW,
            trend: true,
            weekend: true,
            day_of_week: true,
            season: true,
            day_off: true,
            lags: Vec::new(),
            exogenous: Vec::new(),
        }
    }
}

/// Backtest settings
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSection {
    #[serde(default = "default_target")]
    pub target: Source,
    /// Length of the first training window (rows)
    pub initial_window: usize,
    #[serde(default = "default_step_length")]
    pub step_length: usize,
    /// Sample windows with probability `frac`
    #[serde(default)]
    pub testing: bool,
    #[serde(default = "default_frac")]
    pub frac: f64,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<Metric>,
    #[serde(default = "default_true")]
    pub save_plots: bool,
    #[serde(default = "default_plot_freq")]
    pub plot_freq: Frequency,
    /// Optional `[start, end)` row range of the plots
    #[serde(default)]
    pub plot_rows: Option<[usize; 2]>,
}

fn default_target() -> Source {
    Source::EnergyPrice
}

fn default_step_length() -> usize {
    DEFAULT_STEP_LENGTH
}

fn default_frac() -> f64 {
    DEFAULT_FRAC
}

fn default_models() -> Vec<String> {
    vec![
        SEASONAL_NAIVE_MEAN.to_string(),
        SEASONAL_NAIVE_MEAN_3_DAYS.to_string(),
    ]
}

fn default_plot_freq() -> Frequency {
    Frequency::Hourly
}

impl BacktestSection {
    pub fn plot_range(&self) -> Option<Range<usize>> {
        self.plot_rows.map(|[start, end]| start..end)
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate data section
        if self.data.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir cannot be empty".to_string(),
            ));
        }

        for entry in &self.ingest.sources {
            if !entry.file.to_lowercase().ends_with(".csv") {
                return Err(ConfigError::ValidationError(format!(
                    "raw file for {} must be a .csv file, got {}",
                    entry.source, entry.file
                )));
            }
        }

        // Validate features
        if self.features.outliers && self.features.outlier_window < 3 {
            return Err(ConfigError::ValidationError(format!(
                "outlier_window must be >= 3, got {}",
                self.features.outlier_window
            )));
        }

        if self.features.lags.contains(&0) {
            return Err(ConfigError::ValidationError(
                "lags must be > 0".to_string(),
            ));
        }

        // Validate backtest
        let backtest = &self.backtest;
        if backtest.initial_window == 0 {
            return Err(ConfigError::ValidationError(format!(
                "initial_window must be > 0, got {}",
                backtest.initial_window
            )));
        }

        if backtest.step_length == 0 {
            return Err(ConfigError::ValidationError(format!(
                "step_length must be > 0, got {}",
                backtest.step_length
            )));
        }

        if !(0.0..=1.0).contains(&backtest.frac) {
            return Err(ConfigError::ValidationError(format!(
                "frac must be between 0 and 1, got {}",
                backtest.frac
            )));
        }

        if backtest.models.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one model is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for model in &backtest.models {
            if !MODEL_NAMES.contains(&model.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown model {}, expected one of {:?}",
                    model, MODEL_NAMES
                )));
            }
            if !seen.insert(model) {
                return Err(ConfigError::ValidationError(format!(
                    "model {} listed twice",
                    model
                )));
            }
        }

        if backtest.metrics.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one metric is required".to_string(),
            ));
        }

        if let Some([start, end]) = backtest.plot_rows {
            if start >= end {
                return Err(ConfigError::ValidationError(format!(
                    "plot_rows start must be < end, got [{}, {}]",
                    start, end
                )));
            }
        }

        // Validate logging
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown log level {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}
