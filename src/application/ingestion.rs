//! Ingestion Workflow
//!
//! Raw file -> reader -> checker -> curated CSV -> manifest. Every source
//! listed in the `[ingest]` config section is processed in order.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::adapters::readers::reader_for;
use crate::adapters::storage::DatasetBundle;
use crate::config::Config;
use crate::domain::{check_frame, find_gaps, Frame, Frequency, Gap, Source};
use crate::ports::{Downloader, Storage, UploadSummary};

/// Outcome of ingesting one raw file
#[derive(Debug, Clone)]
pub struct IngestionReport {
    pub source: Source,
    pub file: PathBuf,
    pub read_rows: usize,
    pub upload: UploadSummary,
    pub gaps: Vec<Gap>,
    pub manifest_changed: bool,
}

/// Outcome of validating a raw file without storing it
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub source: Source,
    pub rows: usize,
    pub columns: Vec<String>,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub gaps: Vec<Gap>,
}

fn read_checked(source: Source, path: &Path) -> Result<Frame> {
    let reader = reader_for(source);
    let frame = reader
        .read(path)
        .with_context(|| format!("Failed to read {} file {}", source, path.display()))?;
    check_frame(&frame).with_context(|| format!("Invalid {} data in {}", source, path.display()))?;
    Ok(frame)
}

fn hourly_gaps(frame: &Frame) -> Vec<Gap> {
    let gaps = find_gaps(frame.index(), Frequency::Hourly.step());
    for gap in &gaps {
        tracing::warn!(
            "Gap of {} hours between {} and {}",
            gap.missing,
            gap.after,
            gap.before
        );
    }
    gaps
}

/// Read and validate a raw file
pub fn check_file(source: Source, path: &Path) -> Result<CheckReport> {
    let frame = read_checked(source, path)?;
    Ok(CheckReport {
        source,
        rows: frame.len(),
        columns: frame.column_names().iter().map(|s| s.to_string()).collect(),
        first: frame.index().first().copied(),
        last: frame.index().last().copied(),
        gaps: hourly_gaps(&frame),
    })
}

/// Ingest one raw file into the curated bundle
pub fn ingest_file(
    bundle: &mut DatasetBundle,
    source: Source,
    path: &Path,
    backup: bool,
) -> Result<IngestionReport> {
    tracing::info!("Ingesting {} from {}", source, path.display());
    let frame = read_checked(source, path)?;
    let gaps = hourly_gaps(&frame);

    let uploader = bundle.uploader(source, backup)?;
    let upload = uploader
        .upload(&frame)
        .with_context(|| format!("Failed to upload {} to {}", source, uploader.path().display()))?;
    let manifest_changed = bundle.refresh_manifest(source)?;

    Ok(IngestionReport {
        source,
        file: path.to_path_buf(),
        read_rows: frame.len(),
        upload,
        gaps,
        manifest_changed,
    })
}

/// Ingest every configured source
pub fn run_ingestion(config: &Config) -> Result<Vec<IngestionReport>> {
    if config.ingest.sources.is_empty() {
        tracing::warn!("No sources configured under [ingest]");
    }

    let curated = config.data.curated_dir();
    let mut bundle = DatasetBundle::open(&curated)
        .with_context(|| format!("Failed to open curated folder {}", curated.display()))?;

    let mut reports = Vec::with_capacity(config.ingest.sources.len());
    for entry in &config.ingest.sources {
        let path = config.data.resolve(&entry.file);
        let report = ingest_file(&mut bundle, entry.source, &path, config.data.backup)?;
        tracing::info!(
            "{}: read {} rows, appended {}, {} stored",
            report.source,
            report.read_rows,
            report.upload.appended_rows,
            report.upload.total_rows
        );
        reports.push(report);
    }
    Ok(reports)
}

/// Where `fetch` stores a source's raw file: the configured ingest file
/// when there is one, `<raw>/<SOURCE>.csv` otherwise
pub fn raw_destination(config: &Config, source: Source) -> PathBuf {
    config
        .ingest
        .sources
        .iter()
        .find(|e| e.source == source)
        .map(|e| config.data.resolve(&e.file))
        .unwrap_or_else(|| config.data.raw_dir().join(format!("{}.csv", source.name())))
}

/// URL to fetch for `source`: the explicit one, else the configured entry's `url`
pub fn source_url(config: &Config, source: Source, url: Option<&str>) -> Result<String> {
    if let Some(url) = url {
        return Ok(url.to_string());
    }
    config
        .ingest
        .sources
        .iter()
        .filter(|e| e.source == source)
        .find_map(|e| e.url.clone())
        .with_context(|| format!("No URL given and no url configured for {}", source))
}

/// Download a raw report for `source`
pub async fn fetch_source(
    config: &Config,
    source: Source,
    url: Option<&str>,
    downloader: &dyn Downloader,
) -> Result<PathBuf> {
    let url = source_url(config, source, url)?;
    let url = url.as_str();
    let dest = raw_destination(config, source);
    let bytes = downloader
        .download(url, &dest)
        .await
        .with_context(|| format!("Failed to download {} from {}", source, url))?;
    tracing::info!("Fetched {} ({} bytes) into {}", source, bytes, dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestEntry;
    use crate::ports::DownloadError;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const PRICES: &str = "Data;Godzina;RCE\n\
        2023-03-26;1;100,50\n\
        2023-03-26;2;101,00\n\
        2023-03-26;3;99,25\n";

    fn config_for(data_dir: &Path) -> Config {
        let content = format!(
            r#"
[data]
data_dir = "{}"

[[ingest.sources]]
source = "ENERGY_PRICE"
file = "RAW/prices.csv"

[backtest]
initial_window = 24
"#,
            data_dir.display()
        );
        let config: Config = toml::from_str(&content).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_ingest_file_and_manifest() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("prices.csv");
        fs::write(&raw, PRICES).unwrap();

        let mut bundle = DatasetBundle::open(dir.path().join("CURATED")).unwrap();
        let report = ingest_file(&mut bundle, Source::EnergyPrice, &raw, true).unwrap();

        assert_eq!(report.read_rows, 3);
        assert_eq!(report.upload.appended_rows, 3);
        assert!(report.gaps.is_empty());
        assert!(report.manifest_changed);

        // second run appends nothing and leaves the manifest alone
        let again = ingest_file(&mut bundle, Source::EnergyPrice, &raw, true).unwrap();
        assert_eq!(again.upload.appended_rows, 0);
        assert!(!again.manifest_changed);
    }

    #[test]
    fn test_check_file_reports_gaps() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("prices.csv");
        fs::write(&raw, "Data;Godzina;RCE\n2023-03-26;1;1\n2023-03-26;5;2\n").unwrap();

        let report = check_file(Source::EnergyPrice, &raw).unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].missing, 3);
    }

    #[test]
    fn test_check_file_rejects_duplicates() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("prices.csv");
        fs::write(&raw, "Data;Godzina;RCE\n2023-03-26;1;1\n2023-03-26;1;2\n").unwrap();
        assert!(check_file(Source::EnergyPrice, &raw).is_err());
    }

    #[test]
    fn test_run_ingestion_is_idempotent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("RAW")).unwrap();
        fs::write(dir.path().join("RAW").join("prices.csv"), PRICES).unwrap();
        let config = config_for(dir.path());

        run_ingestion(&config).unwrap();
        let curated = dir.path().join("CURATED").join("ENERGY_SETTLEMENT_PRICE.csv");
        let first = fs::read(&curated).unwrap();

        let reports = run_ingestion(&config).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(fs::read(&curated).unwrap(), first);
    }

    #[test]
    fn test_raw_destination() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        assert_eq!(
            raw_destination(&config, Source::EnergyPrice),
            dir.path().join("RAW").join("prices.csv")
        );
        assert!(raw_destination(&config, Source::Weather).ends_with("RAW/WEATHER.csv"));
    }

    struct RecordingDownloader {
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl Downloader for RecordingDownloader {
        async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
            self.calls.lock().unwrap().push((url.to_string(), dest.to_path_buf()));
            Ok(42)
        }
    }

    #[tokio::test]
    async fn test_fetch_source_uses_configured_file() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let downloader = RecordingDownloader {
            calls: Mutex::new(Vec::new()),
        };

        let dest = fetch_source(
            &config,
            Source::EnergyPrice,
            Some("http://example.com/rce.csv"),
            &downloader,
        )
        .await
        .unwrap();

        assert_eq!(dest, dir.path().join("RAW").join("prices.csv"));
        let calls = downloader.calls.lock().unwrap();
        assert_eq!(calls[0].0, "http://example.com/rce.csv");
    }

    #[tokio::test]
    async fn test_fetch_source_falls_back_to_configured_url() {
        let dir = tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.ingest.sources.push(IngestEntry {
            source: Source::EnergyDemand,
            file: "RAW/demand.csv".to_string(),
            url: Some("http://example.com/demand.csv".to_string()),
        });
        let downloader = RecordingDownloader {
            calls: Mutex::new(Vec::new()),
        };

        let dest = fetch_source(&config, Source::EnergyDemand, None, &downloader)
            .await
            .unwrap();

        assert_eq!(dest, dir.path().join("RAW").join("demand.csv"));
        let calls = downloader.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://example.com/demand.csv");
    }

    #[tokio::test]
    async fn test_fetch_source_without_any_url_fails() {
        let dir = tempdir().unwrap();
        let config = config_for(dir.path());
        let downloader = RecordingDownloader {
            calls: Mutex::new(Vec::new()),
        };

        let err = fetch_source(&config, Source::EnergyPrice, None, &downloader)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("ENERGY_PRICE"), "{}", err);
        assert!(downloader.calls.lock().unwrap().is_empty());
    }
}
