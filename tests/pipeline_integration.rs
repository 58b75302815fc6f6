//! Ingestion -> Backtest Integration Tests
//!
//! Drives the two workflows end to end against a temporary data folder:
//! 1. Raw PSE price and weather files are ingested into the curated bundle
//! 2. The curated price series is backtested with seasonal naive models
//! 3. Forecasts, errors and plots land in the results folders
//!
//! All tests are deterministic and use synthetic hourly data.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use powercast::application::{run_backtest, run_ingestion, BacktestOverrides};
use powercast::config::{load_config, Config};
use powercast::domain::{Manifest, Source, MANIFEST_FILE};
use powercast::modeling::Metric;

// ============================================================================
// Test Fixtures
// ============================================================================

const DAYS: i64 = 7;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly price with a daily shape that rises by 1.0 every day
fn price_at(ts: NaiveDateTime) -> f64 {
    let hours = (ts - start()).num_hours();
    200.0 + 10.0 * (hours % 24) as f64 + (hours / 24) as f64
}

/// PSE settlement report: hours 1..=24, decimal commas
fn write_prices(path: &Path) {
    let mut content = String::from("Data;Godzina;RCE\n");
    for day in 0..DAYS {
        let date = start().date() + Duration::days(day);
        for hour in 1..=24 {
            let ts = date.and_hms_opt(0, 0, 0).unwrap() + Duration::hours(hour);
            let value = format!("{:.2}", price_at(ts)).replace('.', ",");
            content.push_str(&format!("{};{};{}\n", date.format("%Y-%m-%d"), hour, value));
        }
    }
    fs::write(path, content).unwrap();
}

/// Weather export covering the first two days only
fn write_weather(path: &Path) {
    let mut content = String::from(
        "DATE,Time,Temperatura,Prędkość wiatru,Podmuchy wiatru,Wilgotność,Widoczność,Zachmurzenie,Opad atmosferyczny,Condition\n",
    );
    for day in 0..2 {
        let date = start().date() + Duration::days(day);
        for hour in 0..24 {
            let ts = date.and_hms_opt(hour, 0, 0).unwrap();
            content.push_str(&format!(
                "{},{},41 °F,5 °mph,0 °mph,80 °%,6 °in,1,0.0 °in,Fair\n",
                date.format("%Y-%m-%d"),
                ts.format("%I:%M %p")
            ));
        }
    }
    fs::write(path, content).unwrap();
}

fn write_config(data_dir: &Path, save_plots: bool) -> Config {
    let content = format!(
        r#"
[data]
data_dir = "{}"
backup = true

[[ingest.sources]]
source = "ENERGY_PRICE"
file = "RAW/prices.csv"

[[ingest.sources]]
source = "WEATHER"
file = "RAW/weather.csv"

[features]
exogenous = ["WEATHER"]

[backtest]
initial_window = 72
step_length = 24
models = ["SEASONAL_NAIVE_LAST", "SEASONAL_NAIVE_MEAN"]
metrics = ["MAE", "RMSE"]
save_plots = {}
plot_freq = "D"

[logging]
level = "debug"
"#,
        data_dir.display(),
        save_plots
    );
    let path = data_dir.join("powercast.toml");
    fs::write(&path, content).unwrap();
    load_config(&path).unwrap()
}

fn prepare(data_dir: &Path, save_plots: bool) -> Config {
    let raw = data_dir.join("RAW");
    fs::create_dir_all(&raw).unwrap();
    write_prices(&raw.join("prices.csv"));
    write_weather(&raw.join("weather.csv"));
    write_config(data_dir, save_plots)
}

// ============================================================================
// Ingestion
// ============================================================================

#[test]
fn test_ingestion_builds_curated_bundle() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), false);

    let reports = run_ingestion(&config).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].source, Source::EnergyPrice);
    assert_eq!(reports[0].read_rows, (DAYS * 24) as usize);
    assert!(reports[0].gaps.is_empty());
    assert_eq!(reports[1].read_rows, 48);

    let curated = dir.path().join("CURATED");
    assert!(curated.join("ENERGY_SETTLEMENT_PRICE.csv").exists());
    assert!(curated.join("WEATHER.csv").exists());

    let manifest = Manifest::load(&curated.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.version, 2);
    let price = manifest.entry("ENERGY_PRICE").unwrap();
    assert_eq!(price.rows, (DAYS * 24) as usize);
    assert_eq!(price.first, Some(start() + Duration::hours(1)));
}

#[test]
fn test_repeated_ingestion_keeps_manifest_version() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), false);

    run_ingestion(&config).unwrap();
    let reports = run_ingestion(&config).unwrap();

    assert!(reports.iter().all(|r| r.upload.appended_rows == 0));
    assert!(reports.iter().all(|r| !r.manifest_changed));
    let manifest = Manifest::load(&dir.path().join("CURATED").join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.version, 2);
}

// ============================================================================
// Backtesting
// ============================================================================

#[test]
fn test_backtest_after_ingestion() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), true);
    run_ingestion(&config).unwrap();

    let report = run_backtest(&config, &BacktestOverrides::default()).unwrap();

    // windows at 72, 96, 120 and 144 rows each forecast one day
    assert_eq!(report.forecasts.len(), 96);
    assert_eq!(
        report.forecasts.models(),
        &["SEASONAL_NAIVE_LAST".to_string(), "SEASONAL_NAIVE_MEAN".to_string()]
    );

    // yesterday's value at the same hour is always 1.0 below today's
    let mae = report.errors.get("SEASONAL_NAIVE_LAST", Metric::Mae).unwrap();
    assert!((mae - 1.0).abs() < 1e-9, "MAE was {}", mae);
    assert_eq!(report.errors.best(Metric::Mae), Some("SEASONAL_NAIVE_LAST"));

    assert!(report.features.has_column("TREND"));
    assert!(report.features.has_column("WEATHER_Temperature"));

    assert!(report.paths.forecasts.starts_with(dir.path().join("RESULTS")));
    assert!(report.paths.forecasts.exists());
    assert!(report.paths.errors.as_ref().unwrap().exists());
    assert_eq!(report.paths.plots.len(), 2);
    assert!(report.paths.plots.iter().all(|p| p.exists()));
}

#[test]
fn test_backtest_overrides_step_length() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), false);
    run_ingestion(&config).unwrap();

    let overrides = BacktestOverrides {
        initial_window: Some(144),
        step_length: Some(12),
        ..BacktestOverrides::default()
    };
    let report = run_backtest(&config, &overrides).unwrap();

    assert_eq!(report.forecasts.len(), 24);
    assert!(report.paths.plots.is_empty());
}

#[test]
fn test_backtest_without_curated_data_fails() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), false);

    assert!(run_backtest(&config, &BacktestOverrides::default()).is_err());
}
