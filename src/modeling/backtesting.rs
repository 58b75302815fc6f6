//! Backtesting Harness
//!
//! Evaluates forecasting models on historical data. For every window of the
//! splitter each model is refitted on the training rows and asked for the
//! test horizon; predictions of all windows are stitched together by
//! timestamp. Errors are computed where predictions and actuals overlap.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::domain::{Frame, FrameError, TimeSeries, ACTUAL};
use crate::modeling::forecasters::default_models;
use crate::modeling::metrics::{default_metrics, Metric, MetricError};
use crate::ports::{ForecastError, Forecaster, SplitError, Splitter};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Split(#[from] SplitError),

    #[error("Model {model} failed: {source}")]
    Forecast {
        model: String,
        #[source]
        source: ForecastError,
    },

    #[error("Metric {metric} failed for model {model}: {source}")]
    Metric {
        model: String,
        metric: Metric,
        #[source]
        source: MetricError,
    },

    #[error("Splitter produced no windows")]
    NoWindows,

    #[error("No models to evaluate")]
    NoModels,

    #[error("Duplicate model name: {0}")]
    DuplicateModel(String),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Stitched predictions: one column per model plus `ACTUAL`
#[derive(Debug, Clone)]
pub struct ForecastTable {
    frame: Frame,
    models: Vec<String>,
}

impl ForecastTable {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn forecast(&self, model: &str) -> Option<&[f64]> {
        self.frame.column(model)
    }

    pub fn actual(&self) -> Option<&[f64]> {
        self.frame.column(ACTUAL)
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}

/// Metric values per model
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorTable {
    metrics: Vec<Metric>,
    rows: Vec<(String, Vec<f64>)>,
}

impl ErrorTable {
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn rows(&self) -> &[(String, Vec<f64>)] {
        &self.rows
    }

    pub fn get(&self, model: &str, metric: Metric) -> Option<f64> {
        let col = self.metrics.iter().position(|m| *m == metric)?;
        self.rows
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, values)| values[col])
    }

    /// Model with the lowest value of `metric`
    pub fn best(&self, metric: Metric) -> Option<&str> {
        let col = self.metrics.iter().position(|m| *m == metric)?;
        self.rows
            .iter()
            .filter(|(_, v)| !v[col].is_nan())
            .min_by(|a, b| a.1[col].total_cmp(&b.1[col]))
            .map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for ErrorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(5);

        write!(f, "{:<width$}", "MODEL", width = width)?;
        for metric in &self.metrics {
            write!(f, " {:>12}", metric.name())?;
        }
        writeln!(f)?;

        for (name, values) in &self.rows {
            write!(f, "{:<width$}", name, width = width)?;
            for value in values {
                write!(f, " {:>12.4}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Compares named models over the windows of a splitter
pub struct Backtester {
    splitter: Box<dyn Splitter>,
    models: Vec<(String, Box<dyn Forecaster>)>,
    metrics: Vec<Metric>,
    errors: Option<ErrorTable>,
}

impl Backtester {
    pub fn new(
        splitter: Box<dyn Splitter>,
        models: Vec<(String, Box<dyn Forecaster>)>,
        metrics: Vec<Metric>,
    ) -> Result<Self, BacktestError> {
        if models.is_empty() {
            return Err(BacktestError::NoModels);
        }
        for (i, (name, _)) in models.iter().enumerate() {
            if models[..i].iter().any(|(other, _)| other == name) {
                return Err(BacktestError::DuplicateModel(name.clone()));
            }
        }
        Ok(Self {
            splitter,
            models,
            metrics,
            errors: None,
        })
    }

    /// Backtester with the default models and metrics
    pub fn with_defaults(splitter: Box<dyn Splitter>) -> Result<Self, BacktestError> {
        Self::new(splitter, default_models(), default_metrics())
    }

    /// Errors of the last `evaluate` call
    pub fn errors(&self) -> Option<&ErrorTable> {
        self.errors.as_ref()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Run every model over every window and return the stitched forecasts
    pub fn evaluate(&mut self, y: &TimeSeries) -> Result<ForecastTable, BacktestError> {
        let windows = self.splitter.windows(y.index())?;
        if windows.is_empty() {
            return Err(BacktestError::NoWindows);
        }
        let fh = self.splitter.horizon().to_vec();
        let values = y.values();

        let mut predictions: Vec<BTreeMap<usize, f64>> = Vec::with_capacity(self.models.len());
        for (name, model) in self.models.iter_mut() {
            let forecast_err = |source| BacktestError::Forecast {
                model: name.clone(),
                source,
            };

            let mut stitched = BTreeMap::new();
            for window in &windows {
                model.fit(&values[window.train.clone()]).map_err(forecast_err)?;
                let preds = model.predict(&fh).map_err(forecast_err)?;
                for (&pos, pred) in window.test.iter().zip(preds) {
                    if pos < values.len() {
                        // later windows win on overlap
                        stitched.insert(pos, pred);
                    }
                }
            }
            tracing::info!("Evaluated {} on {} windows", name, windows.len());
            predictions.push(stitched);
        }

        let mut positions: Vec<usize> = predictions
            .iter()
            .flat_map(|p| p.keys().copied())
            .collect();
        positions.sort_unstable();
        positions.dedup();

        let index = positions.iter().map(|&p| y.index()[p]).collect();
        let mut frame = Frame::new(index);
        for ((name, _), stitched) in self.models.iter().zip(&predictions) {
            let column = positions
                .iter()
                .map(|p| stitched.get(p).copied().unwrap_or(f64::NAN))
                .collect();
            frame.insert_column(name.clone(), column)?;
        }
        frame.insert_column(ACTUAL, positions.iter().map(|&p| values[p]).collect())?;

        let table = ForecastTable {
            frame,
            models: self.models.iter().map(|(n, _)| n.clone()).collect(),
        };
        self.errors = Some(self.calculate_errors(&table)?);
        Ok(table)
    }

    fn calculate_errors(&self, table: &ForecastTable) -> Result<ErrorTable, BacktestError> {
        let actual = table.frame.require(ACTUAL)?;
        let mut rows = Vec::with_capacity(table.models.len());
        for model in &table.models {
            let forecast = table.frame.require(model)?;
            let values = self
                .metrics
                .iter()
                .map(|metric| {
                    metric
                        .compute(actual, forecast)
                        .map_err(|source| BacktestError::Metric {
                            model: model.clone(),
                            metric: *metric,
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push((model.clone(), values));
        }
        Ok(ErrorTable {
            metrics: self.metrics.clone(),
            rows,
        })
    }
}

impl fmt::Debug for Backtester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backtester")
            .field("models", &self.model_names())
            .field("metrics", &self.metrics)
            .finish()
    }
}
