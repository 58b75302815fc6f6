//! Result Recorder
//!
//! Persists backtest output: the forecast table and error table as CSV
//! under the results folder, and one actuals-vs-forecast chart per model
//! under the plots folder. File names carry a `%d-%m_%H_%M_%S` stamp.

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adapters::plotting::{plot_forecast, PlotError};
use crate::adapters::storage::write_frame_csv;
use crate::domain::Frequency;
use crate::modeling::{ErrorTable, ForecastTable};
use crate::ports::StorageError;

/// Timestamp format used in result file names
pub const STAMP_FORMAT: &str = "%d-%m_%H_%M_%S";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Plot(#[from] PlotError),

    #[error("Failed to write error table: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Forecast table has no ACTUAL column")]
    MissingActuals,
}

/// Files written by one `record` call
#[derive(Debug, Clone, Default)]
pub struct RecordedPaths {
    pub forecasts: PathBuf,
    pub errors: Option<PathBuf>,
    pub plots: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResultRecorder {
    results_dir: PathBuf,
    plots_dir: PathBuf,
    save_plots: bool,
    plot_freq: Frequency,
    plot_rows: Option<Range<usize>>,
}

impl ResultRecorder {
    /// Recorder saving tables and hourly plots of every row
    pub fn new(results_dir: impl Into<PathBuf>, plots_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            plots_dir: plots_dir.into(),
            save_plots: true,
            plot_freq: Frequency::Hourly,
            plot_rows: None,
        }
    }

    pub fn with_plots(mut self, freq: Frequency, rows: Option<Range<usize>>) -> Self {
        self.save_plots = true;
        self.plot_freq = freq;
        self.plot_rows = rows;
        self
    }

    pub fn without_plots(mut self) -> Self {
        self.save_plots = false;
        self
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn plots_dir(&self) -> &Path {
        &self.plots_dir
    }

    /// Save results stamped with the current local time
    pub fn record(
        &self,
        table: &ForecastTable,
        errors: Option<&ErrorTable>,
    ) -> Result<RecordedPaths, RecordError> {
        self.record_at(table, errors, Local::now().naive_local())
    }

    /// Save results stamped with `now`
    pub fn record_at(
        &self,
        table: &ForecastTable,
        errors: Option<&ErrorTable>,
        now: NaiveDateTime,
    ) -> Result<RecordedPaths, RecordError> {
        let stamp = now.format(STAMP_FORMAT).to_string();
        fs::create_dir_all(&self.results_dir)?;

        let forecasts = self.results_dir.join(format!("{}.csv", stamp));
        write_frame_csv(&forecasts, table.frame())?;
        tracing::info!("Saved forecasts to {}", forecasts.display());

        let errors = match errors {
            Some(errors) => {
                let path = self.results_dir.join(format!("{}_errors.csv", stamp));
                write_error_table(&path, errors)?;
                Some(path)
            }
            None => None,
        };

        let mut plots = Vec::new();
        if self.save_plots {
            fs::create_dir_all(&self.plots_dir)?;
            let actual = table.actual().ok_or(RecordError::MissingActuals)?;
            for model in table.models() {
                let Some(forecast) = table.forecast(model) else {
                    continue;
                };
                let path = self.plots_dir.join(format!("{}_{}.png", model, stamp));
                match plot_forecast(
                    &path,
                    table.frame().index(),
                    actual,
                    forecast,
                    self.plot_freq,
                    self.plot_rows.clone(),
                ) {
                    Ok(()) => plots.push(path),
                    Err(PlotError::Empty) => {
                        tracing::warn!("Nothing to plot for {}, skipping chart", model)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(RecordedPaths {
            forecasts,
            errors,
            plots,
        })
    }
}

/// Write `MODEL,<metric>...` rows
pub fn write_error_table(path: &Path, errors: &ErrorTable) -> Result<(), RecordError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["MODEL".to_string()];
    header.extend(errors.metrics().iter().map(|m| m.name().to_string()));
    writer.write_record(&header)?;

    for (model, values) in errors.rows() {
        let mut record = vec![model.clone()];
        record.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeSeries;
    use crate::modeling::splitter::{horizon, ExpandingWindowSplitter};
    use crate::modeling::{Backtester, Metric, NaiveForecaster, Strategy};
    use crate::ports::Forecaster;
    use chrono::NaiveDate;
    use regex::Regex;
    use tempfile::tempdir;

    fn backtest() -> (ForecastTable, ErrorTable) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let index = (0..48).map(|h| start + chrono::Duration::hours(h)).collect();
        let values = (0..48).map(|h| 100.0 + (h % 24) as f64).collect();
        let y = TimeSeries::new("VALUE", index, values).unwrap();

        let splitter = ExpandingWindowSplitter::new(24, 12, horizon(12)).unwrap();
        let model = NaiveForecaster::new(Strategy::Last, 1, None).unwrap();
        let mut backtester = Backtester::new(
            Box::new(splitter),
            vec![("NAIVE_LAST".to_string(), Box::new(model) as Box<dyn Forecaster>)],
            vec![Metric::Mae, Metric::Rmse],
        )
        .unwrap();
        let table = backtester.evaluate(&y).unwrap();
        let errors = backtester.errors().unwrap().clone();
        (table, errors)
    }

    #[test]
    fn test_record_writes_stamped_files() {
        let dir = tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path().join("RESULTS"), dir.path().join("PLOTS"))
            .with_plots(Frequency::Daily, None);
        let (table, errors) = backtest();

        let now = NaiveDate::from_ymd_opt(2024, 5, 7)
            .unwrap()
            .and_hms_opt(8, 9, 10)
            .unwrap();
        let paths = recorder.record_at(&table, Some(&errors), now).unwrap();

        assert_eq!(paths.forecasts, dir.path().join("RESULTS").join("07-05_08_09_10.csv"));
        assert!(paths.forecasts.exists());
        assert_eq!(paths.plots, vec![dir.path().join("PLOTS").join("NAIVE_LAST_07-05_08_09_10.png")]);
        assert!(paths.plots[0].exists());

        let content = fs::read_to_string(paths.errors.unwrap()).unwrap();
        assert!(content.starts_with("MODEL,MAE,RMSE\nNAIVE_LAST,"));
    }

    #[test]
    fn test_record_without_plots() {
        let dir = tempdir().unwrap();
        let recorder =
            ResultRecorder::new(dir.path().join("RESULTS"), dir.path().join("PLOTS")).without_plots();
        let (table, _) = backtest();

        let paths = recorder.record(&table, None).unwrap();
        assert!(paths.plots.is_empty());
        assert!(paths.errors.is_none());
        assert!(!dir.path().join("PLOTS").exists());

        let name = paths.forecasts.file_name().unwrap().to_string_lossy().to_string();
        let pattern = Regex::new(r"^\d{2}-\d{2}_\d{2}_\d{2}_\d{2}\.csv$").unwrap();
        assert!(pattern.is_match(&name), "{}", name);
    }

    #[test]
    fn test_forecast_csv_has_models_and_actuals() {
        let dir = tempdir().unwrap();
        let recorder = ResultRecorder::new(dir.path(), dir.path()).without_plots();
        let (table, _) = backtest();
        let paths = recorder.record(&table, None).unwrap();

        let content = fs::read_to_string(paths.forecasts).unwrap();
        assert!(content.starts_with("TIME,NAIVE_LAST,ACTUAL\n"));
        assert_eq!(content.lines().count(), table.len() + 1);
    }
}
