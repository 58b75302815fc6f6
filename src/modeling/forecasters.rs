//! Naive Forecasters
//!
//! Baseline models for hourly prices. A seasonal model with period `sp`
//! predicts step `h` from past observations that share its position in
//! the season, i.e. rows `j` with `(n - 1 + h - j) % sp == 0`.

use crate::ports::{ForecastError, Forecaster};

pub const SEASONAL_NAIVE_MEAN: &str = "SEASONAL_NAIVE_MEAN";
pub const SEASONAL_NAIVE_MEAN_3_DAYS: &str = "SEASONAL_NAIVE_MEAN_3_DAYS";
pub const SEASONAL_NAIVE_LAST: &str = "SEASONAL_NAIVE_LAST";
pub const NAIVE_LAST: &str = "NAIVE_LAST";
pub const NAIVE_DRIFT: &str = "NAIVE_DRIFT";

/// Hours in a day
pub const DAILY_PERIOD: usize = 24;

/// How a naive forecaster turns history into a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Most recent value of the same season
    Last,
    /// Mean of same-season values inside the window
    Mean,
    /// Straight line through the first and last value of the window
    Drift,
}

#[derive(Debug, Clone)]
pub struct NaiveForecaster {
    strategy: Strategy,
    sp: usize,
    window_length: Option<usize>,
    history: Option<Vec<f64>>,
}

impl NaiveForecaster {
    pub fn new(
        strategy: Strategy,
        sp: usize,
        window_length: Option<usize>,
    ) -> Result<Self, ForecastError> {
        if sp == 0 {
            return Err(ForecastError::InvalidParameter("sp must be positive".into()));
        }
        if window_length == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "window_length must be positive".into(),
            ));
        }
        if strategy == Strategy::Drift && sp != 1 {
            return Err(ForecastError::InvalidParameter(
                "drift strategy requires sp = 1".into(),
            ));
        }
        Ok(Self {
            strategy,
            sp,
            window_length,
            history: None,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn is_fitted(&self) -> bool {
        self.history.is_some()
    }

    /// Same-season values for step `h`, newest first
    fn season_values<'a>(&self, y: &'a [f64], h: usize) -> impl Iterator<Item = f64> + 'a {
        let n = y.len();
        // first same-season row at or before the end of the series
        let lag = (h - 1) % self.sp;
        let newest = (n - 1).checked_sub(self.sp - 1 - lag);
        let sp = self.sp;
        newest
            .into_iter()
            .flat_map(move |last| (0..=last / sp).map(move |k| last - k * sp))
            .map(move |j| y[j])
    }

    fn predict_step(&self, y: &[f64], h: usize) -> f64 {
        match self.strategy {
            Strategy::Last => self
                .season_values(y, h)
                .find(|v| !v.is_nan())
                .unwrap_or(f64::NAN),
            Strategy::Mean => {
                let (sum, count) = self
                    .season_values(y, h)
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                if count == 0 {
                    f64::NAN
                } else {
                    sum / count as f64
                }
            }
            Strategy::Drift => {
                let valid: Vec<(usize, f64)> = y
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(_, v)| !v.is_nan())
                    .collect();
                match (valid.first(), valid.last()) {
                    (Some(&(i0, first)), Some(&(i1, last))) => {
                        let slope = if i1 > i0 {
                            (last - first) / (i1 - i0) as f64
                        } else {
                            0.0
                        };
                        last + slope * (y.len() - 1 - i1 + h) as f64
                    }
                    _ => f64::NAN,
                }
            }
        }
    }
}

impl Forecaster for NaiveForecaster {
    fn fit(&mut self, y: &[f64]) -> Result<(), ForecastError> {
        if y.is_empty() {
            return Err(ForecastError::EmptySeries);
        }
        let start = match self.window_length {
            Some(w) if self.strategy != Strategy::Last => y.len().saturating_sub(w),
            _ => 0,
        };
        self.history = Some(y[start..].to_vec());
        Ok(())
    }

    fn predict(&self, fh: &[usize]) -> Result<Vec<f64>, ForecastError> {
        let y = self.history.as_deref().ok_or(ForecastError::NotFitted)?;
        if fh.is_empty() || fh.contains(&0) {
            return Err(ForecastError::InvalidHorizon);
        }
        Ok(fh.iter().map(|&h| self.predict_step(y, h)).collect())
    }
}

/// Build a named model
pub fn model_by_name(name: &str) -> Result<Box<dyn Forecaster>, ForecastError> {
    let model = match name {
        SEASONAL_NAIVE_MEAN => NaiveForecaster::new(Strategy::Mean, DAILY_PERIOD, None)?,
        SEASONAL_NAIVE_MEAN_3_DAYS => {
            NaiveForecaster::new(Strategy::Mean, DAILY_PERIOD, Some(3 * DAILY_PERIOD))?
        }
        SEASONAL_NAIVE_LAST => NaiveForecaster::new(Strategy::Last, DAILY_PERIOD, None)?,
        NAIVE_LAST => NaiveForecaster::new(Strategy::Last, 1, None)?,
        NAIVE_DRIFT => NaiveForecaster::new(Strategy::Drift, 1, None)?,
        other => {
            return Err(ForecastError::InvalidParameter(format!(
                "unknown model {}",
                other
            )))
        }
    };
    Ok(Box::new(model))
}

/// Names of every model `model_by_name` knows
pub const MODEL_NAMES: [&str; 5] = [
    SEASONAL_NAIVE_MEAN,
    SEASONAL_NAIVE_MEAN_3_DAYS,
    SEASONAL_NAIVE_LAST,
    NAIVE_LAST,
    NAIVE_DRIFT,
];

/// Default models compared by the backtester
pub fn default_models() -> Vec<(String, Box<dyn Forecaster>)> {
    [SEASONAL_NAIVE_MEAN, SEASONAL_NAIVE_MEAN_3_DAYS]
        .into_iter()
        .filter_map(|name| model_by_name(name).ok().map(|m| (name.to_string(), m)))
        .collect()
}
