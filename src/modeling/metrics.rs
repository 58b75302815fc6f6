//! Forecast error metrics
//!
//! Pure functions of (actuals, predictions). Pairs where either side is NaN
//! are skipped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricError {
    #[error("Length mismatch: {actual} actuals, {predicted} predictions")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("No overlapping non-missing values")]
    NoValidPairs,

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    /// Mean absolute percentage error, as a fraction
    Mape,
    Mae,
    Rmse,
    Mse,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Mape, Metric::Mae, Metric::Rmse, Metric::Mse];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mape => "MAPE",
            Metric::Mae => "MAE",
            Metric::Rmse => "RMSE",
            Metric::Mse => "MSE",
        }
    }

    pub fn compute(&self, actual: &[f64], predicted: &[f64]) -> Result<f64, MetricError> {
        if actual.len() != predicted.len() {
            return Err(MetricError::LengthMismatch {
                actual: actual.len(),
                predicted: predicted.len(),
            });
        }

        let pairs: Vec<(f64, f64)> = actual
            .iter()
            .zip(predicted)
            .filter(|(a, p)| !a.is_nan() && !p.is_nan())
            .map(|(a, p)| (*a, *p))
            .collect();
        if pairs.is_empty() {
            return Err(MetricError::NoValidPairs);
        }
        let n = pairs.len() as f64;

        let value = match self {
            Metric::Mape => {
                pairs
                    .iter()
                    .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
                    .sum::<f64>()
                    / n
            }
            Metric::Mae => pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n,
            Metric::Mse => pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n,
            Metric::Rmse => (pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n).sqrt(),
        };
        Ok(value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MetricError::UnknownMetric(s.to_string()))
    }
}

/// MAPE, MAE and RMSE
pub fn default_metrics() -> Vec<Metric> {
    vec![Metric::Mape, Metric::Mae, Metric::Rmse]
}
