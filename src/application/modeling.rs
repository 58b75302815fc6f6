//! Modeling Workflow
//!
//! Curated bundle -> feature pipeline -> backtest of the target `VALUE`
//! series -> recorded forecasts, errors and plots.

use anyhow::{bail, Context, Result};
use std::path::Path;

use super::recorder::{RecordedPaths, ResultRecorder};
use crate::adapters::storage::DatasetBundle;
use crate::config::{Config, FeaturesSection};
use crate::domain::{Frame, VALUE};
use crate::modeling::{
    get_splitter, model_by_name, Backtester, DayOfWeekIndicatorCreator, DayOffIndicatorCreator,
    ErrorTable, ForecastTable, LagCreator, LinearInterpolator, OutlierFlagCreator, Pipeline,
    SeasonIndicatorCreator, TrendCreator, WeekendIndicatorCreator,
};
use crate::ports::Forecaster;

/// Command-line overrides of the `[backtest]` section
#[derive(Debug, Clone, Default)]
pub struct BacktestOverrides {
    pub testing: Option<bool>,
    pub frac: Option<f64>,
    pub initial_window: Option<usize>,
    pub step_length: Option<usize>,
}

/// Everything a backtest run produced
#[derive(Debug)]
pub struct BacktestReport {
    pub features: Frame,
    pub forecasts: ForecastTable,
    pub errors: ErrorTable,
    pub paths: RecordedPaths,
}

/// Feature pipeline described by the `[features]` section. A missing
/// holidays calendar degrades the day-off indicator to weekends only.
pub fn build_pipeline(features: &FeaturesSection, holidays: &Path) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new();
    let outliers = || OutlierFlagCreator::new(Some(features.outlier_window), !features.replace_outliers);

    // replaced outliers become NaN and are filled by the interpolator
    if features.outliers && features.replace_outliers {
        pipeline.push(Box::new(outliers()?));
    }
    if features.interpolate {
        pipeline.push(Box::new(LinearInterpolator));
    }
    if features.outliers && !features.replace_outliers {
        pipeline.push(Box::new(outliers()?));
    }
    if features.trend {
        pipeline.push(Box::new(TrendCreator));
    }
    if features.weekend {
        pipeline.push(Box::new(WeekendIndicatorCreator));
    }
    if features.day_of_week {
        pipeline.push(Box::new(DayOfWeekIndicatorCreator));
    }
    if features.season {
        pipeline.push(Box::new(SeasonIndicatorCreator));
    }
    if features.day_off {
        let creator = if holidays.exists() {
            DayOffIndicatorCreator::from_file(holidays)?
        } else {
            tracing::warn!(
                "Holidays file {} not found, day-off indicator uses weekends only",
                holidays.display()
            );
            DayOffIndicatorCreator::default()
        };
        pipeline.push(Box::new(creator));
    }
    if !features.lags.is_empty() {
        pipeline.push(Box::new(LagCreator::new(features.lags.clone())?));
    }

    tracing::debug!("Feature pipeline: {:?}", pipeline.names());
    Ok(pipeline)
}

/// Instantiate the named models
pub fn build_models(names: &[String]) -> Result<Vec<(String, Box<dyn Forecaster>)>> {
    names
        .iter()
        .map(|name| {
            let model = model_by_name(name).with_context(|| format!("Cannot build model {}", name))?;
            Ok((name.clone(), model))
        })
        .collect()
}

/// Run the configured backtest and record its results
pub fn run_backtest(config: &Config, overrides: &BacktestOverrides) -> Result<BacktestReport> {
    let settings = &config.backtest;
    let initial_window = overrides.initial_window.unwrap_or(settings.initial_window);
    let step_length = overrides.step_length.unwrap_or(settings.step_length);
    let testing = overrides.testing.unwrap_or(settings.testing);
    let frac = overrides.frac.unwrap_or(settings.frac);

    let curated = config.data.curated_dir();
    let bundle = DatasetBundle::open(&curated)
        .with_context(|| format!("Failed to open curated folder {}", curated.display()))?;
    let data = bundle
        .load_with_exogenous(settings.target, &config.features.exogenous)
        .with_context(|| format!("Failed to load {} from {}", settings.target, curated.display()))?;
    if data.is_empty() {
        bail!("No curated {} data, run ingest first", settings.target);
    }
    tracing::info!(
        "Loaded {} rows of {} ({} to {})",
        data.len(),
        settings.target,
        data.index()[0],
        data.index()[data.len() - 1]
    );

    let mut pipeline = build_pipeline(&config.features, &bundle.holidays_path())?;
    let features = pipeline
        .fit_transform(&data)
        .context("Feature generation failed")?;
    tracing::info!("Generated {} feature columns", features.columns().len());

    let y = features.series(VALUE)?;
    let splitter = get_splitter(initial_window, step_length, testing, frac)?;
    let models = build_models(&settings.models)?;
    let mut backtester = Backtester::new(splitter, models, settings.metrics.clone())?;

    let forecasts = backtester.evaluate(&y).context("Backtest failed")?;
    let errors = backtester
        .errors()
        .cloned()
        .context("Backtest produced no error table")?;

    let mut recorder = ResultRecorder::new(config.data.results_dir(), config.data.plots_dir());
    recorder = if settings.save_plots {
        recorder.with_plots(settings.plot_freq, settings.plot_range())
    } else {
        recorder.without_plots()
    };
    let paths = recorder
        .record(&forecasts, Some(&errors))
        .context("Failed to save backtest results")?;

    Ok(BacktestReport {
        features,
        forecasts,
        errors,
        paths,
    })
}
