//! Modeling ports
//!
//! Traits for feature transformers, forecasting models and train/test
//! splitters. The backtester only ever talks to these traits.

use chrono::NaiveDateTime;
use std::ops::Range;
use thiserror::Error;

use crate::domain::{Frame, FrameError};

/// Feature transformation errors
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to read holidays: {0}")]
    Holidays(String),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Forecasting model errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Model must be fitted before predicting")]
    NotFitted,

    #[error("Cannot fit on an empty series")]
    EmptySeries,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Forecast horizon must be non-empty and start at 1 or later")]
    InvalidHorizon,
}

/// Splitter errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Series of length {len} is too short for window {window} and horizon {horizon}")]
    SeriesTooShort {
        len: usize,
        window: usize,
        horizon: usize,
    },
}

/// Derives feature columns from a frame
pub trait Transformer {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Learn state from training data (most transformers are stateless)
    fn fit(&mut self, _x: &Frame) -> Result<(), TransformError> {
        Ok(())
    }

    /// Return a new frame with the transformation applied
    fn transform(&self, x: &Frame) -> Result<Frame, TransformError>;
}

/// A univariate forecasting model
#[cfg_attr(test, mockall::automock)]
pub trait Forecaster {
    /// Fit on the training values (oldest first); refitting discards prior state
    fn fit(&mut self, y: &[f64]) -> Result<(), ForecastError>;

    /// Predict the given relative steps ahead of the last training value
    fn predict(&self, fh: &[usize]) -> Result<Vec<f64>, ForecastError>;
}

/// One train/test split, as row positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub train: Range<usize>,
    pub test: Vec<usize>,
}

impl Window {
    /// Last training position
    pub fn cutoff(&self) -> usize {
        self.train.end.saturating_sub(1)
    }
}

/// Generates train/test windows over a series of a given length
pub trait Splitter {
    /// Relative forecast horizon (steps after the cutoff)
    fn horizon(&self) -> &[usize];

    /// Windows for a series of length `n`
    fn split(&self, n: usize) -> Result<Vec<Window>, SplitError>;

    /// Windows for a time index, logging each one
    fn windows(&self, index: &[NaiveDateTime]) -> Result<Vec<Window>, SplitError> {
        let windows = self.split(index.len())?;
        for (counter, window) in windows.iter().enumerate() {
            if let Some(&last) = window.test.last() {
                tracing::info!("{} forecast -- last index: {}", counter + 1, index[last]);
            }
        }
        Ok(windows)
    }
}
