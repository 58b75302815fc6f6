//! CLI Command Handlers
//!
//! Implementation of all CLI commands for powercast.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::adapters::http::HttpDownloader;
use crate::application::{self, BacktestOverrides};
use crate::config::{load_config, Config};
use crate::domain::Source;

const DEFAULT_CONFIG: &str = "config/powercast.toml";

/// powercast - Electricity price forecasting for the Polish market
#[derive(Parser, Debug)]
#[command(
    name = "powercast",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Electricity price forecasting for the Polish market",
    long_about = "powercast curates PSE price, demand and weather reports into a dataset \
                  bundle, generates calendar features and backtests forecasting models \
                  with expanding windows."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ingest configured raw files into the curated folder
    Ingest(IngestCmd),

    /// Download a raw report into the raw folder
    Fetch(FetchCmd),

    /// Backtest models on the curated target series
    Backtest(BacktestCmd),

    /// List known data sources
    Sources,

    /// Read and validate a raw file without storing it
    Check(CheckCmd),
}

impl Command {
    /// Config file used by the command, if any
    pub fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Ingest(cmd) => Some(&cmd.config),
            Command::Fetch(cmd) => Some(&cmd.config),
            Command::Backtest(cmd) => Some(&cmd.config),
            Command::Sources | Command::Check(_) => None,
        }
    }
}

/// Ingest raw files
#[derive(Parser, Debug)]
pub struct IngestCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Download a raw report
#[derive(Parser, Debug)]
pub struct FetchCmd {
    /// Source the report belongs to (e.g. ENERGY_PRICE)
    #[arg(value_name = "SOURCE")]
    pub source: Source,

    /// Report URL (defaults to the source's `url` in the config)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Run backtesting
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Evaluate only a random sample of windows
    #[arg(long)]
    pub testing: bool,

    /// Fraction of windows kept with --testing
    #[arg(long, value_name = "FRAC")]
    pub frac: Option<f64>,

    /// Override initial training window (rows)
    #[arg(long, value_name = "ROWS")]
    pub initial_window: Option<usize>,

    /// Override step length and horizon (rows)
    #[arg(long, value_name = "ROWS")]
    pub step: Option<usize>,
}

/// Validate a raw file
#[derive(Parser, Debug)]
pub struct CheckCmd {
    /// Raw file to read
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Source of the file (e.g. WEATHER)
    #[arg(short, long, value_name = "SOURCE")]
    pub source: Source,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let level = app
        .command
        .config_path()
        .and_then(|path| load_config(path).ok())
        .map(|config| config.logging.level);
    init_logging(app.verbose, app.debug, level.as_deref())?;

    match app.command {
        Command::Ingest(cmd) => ingest_command(cmd),
        Command::Fetch(cmd) => fetch_command(cmd).await,
        Command::Backtest(cmd) => backtest_command(cmd),
        Command::Sources => sources_command(),
        Command::Check(cmd) => check_command(cmd),
    }
}

/// Initialize logging system
fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    load_config(path).with_context(|| format!("Failed to load configuration {}", path.display()))
}

/// Handle ingest command
fn ingest_command(cmd: IngestCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let reports = application::run_ingestion(&config)?;

    println!("Ingested {} source(s) into {}", reports.len(), config.data.curated_dir().display());
    for report in &reports {
        println!(
            "  {:<14} {:>7} read {:>7} new {:>8} total {:>4} gap(s)",
            report.source.name(),
            report.read_rows,
            report.upload.appended_rows,
            report.upload.total_rows,
            report.gaps.len()
        );
    }
    Ok(())
}

/// Handle fetch command
async fn fetch_command(cmd: FetchCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let downloader = HttpDownloader::new().context("Failed to create HTTP client")?;
    let dest = application::fetch_source(&config, cmd.source, cmd.url.as_deref(), &downloader).await?;
    println!("Saved {} report to {}", cmd.source, dest.display());
    Ok(())
}

/// Handle backtest command
fn backtest_command(cmd: BacktestCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let overrides = BacktestOverrides {
        testing: cmd.testing.then_some(true),
        frac: cmd.frac,
        initial_window: cmd.initial_window,
        step_length: cmd.step,
    };

    let report = application::run_backtest(&config, &overrides)?;

    println!(
        "Backtested {} model(s) on {} forecast rows",
        report.forecasts.models().len(),
        report.forecasts.len()
    );
    println!();
    print!("{}", report.errors);
    println!();
    println!("Forecasts: {}", report.paths.forecasts.display());
    if let Some(ref errors) = report.paths.errors {
        println!("Errors:    {}", errors.display());
    }
    for plot in &report.paths.plots {
        println!("Plot:      {}", plot.display());
    }
    Ok(())
}

/// Handle sources command
fn sources_command() -> Result<()> {
    for source in Source::ALL {
        let meta = source.metadata();
        println!("{} -> {}", source, source.curated_file());
        println!("  numeric: {}", meta.numeric_columns.join(", "));
        println!("  updated: {}", meta.frequency.as_str());
    }
    Ok(())
}

/// Handle check command
fn check_command(cmd: CheckCmd) -> Result<()> {
    let report = application::check_file(cmd.source, &cmd.file)?;

    println!("{} OK: {} rows", cmd.file.display(), report.rows);
    println!("  columns: {}", report.columns.join(", "));
    if let (Some(first), Some(last)) = (report.first, report.last) {
        println!("  range:   {} .. {}", first, last);
    }
    if report.gaps.is_empty() {
        println!("  no gaps");
    } else {
        println!("  {} gap(s):", report.gaps.len());
        for gap in &report.gaps {
            println!("    {} missing between {} and {}", gap.missing, gap.after, gap.before);
        }
    }
    Ok(())
}
