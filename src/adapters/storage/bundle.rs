//! Curated Dataset Bundle
//!
//! The curated folder holds one CSV per source plus a holidays calendar and
//! a manifest. Ingestion writes into it; modeling reads from it.

use std::path::{Path, PathBuf};

use super::csv_store::{read_frame_csv, CsvUploader};
use crate::domain::{Frame, Manifest, ManifestEntry, Source};
use crate::ports::{Storage, StorageError};

/// Holidays calendar, relative to the curated folder
pub const HOLIDAYS_FILE: &str = "HOLIDAYS/holidays.csv";

/// Read/write access to the curated folder
#[derive(Debug, Clone)]
pub struct DatasetBundle {
    curated_dir: PathBuf,
    manifest: Manifest,
}

impl DatasetBundle {
    /// Open a curated folder, loading its manifest if present
    pub fn open(curated_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let curated_dir = curated_dir.into();
        let manifest = Manifest::load(&Manifest::default_path(&curated_dir))
            .map_err(|e| StorageError::Parse(e.to_string()))?;
        Ok(Self {
            curated_dir,
            manifest,
        })
    }

    pub fn curated_dir(&self) -> &Path {
        &self.curated_dir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Path of a source's curated file
    pub fn path_of(&self, source: Source) -> PathBuf {
        self.curated_dir.join(source.curated_file())
    }

    pub fn holidays_path(&self) -> PathBuf {
        self.curated_dir.join(HOLIDAYS_FILE)
    }

    /// Uploader writing into a source's curated file
    pub fn uploader(&self, source: Source, backup: bool) -> Result<CsvUploader, StorageError> {
        CsvUploader::new(self.path_of(source), backup)
    }

    /// Load a curated source
    pub fn load(&self, source: Source) -> Result<Frame, StorageError> {
        read_frame_csv(&self.path_of(source))
    }

    /// Load `target` and left-join every exogenous source on timestamp.
    /// Joined columns are prefixed with `<SOURCE>_`.
    pub fn load_with_exogenous(
        &self,
        target: Source,
        exogenous: &[Source],
    ) -> Result<Frame, StorageError> {
        let mut frame = self.load(target)?;
        for source in exogenous.iter().filter(|s| **s != target) {
            let other = self.load(*source)?;
            frame = frame
                .left_join(&other, &format!("{}_", source.name()))
                .map_err(|e| StorageError::Parse(e.to_string()))?;
            tracing::debug!("Joined {} columns from {}", other.columns().len(), source);
        }
        Ok(frame)
    }

    /// Re-read a source file and record it in the manifest.
    /// Returns true when the manifest changed (and was saved).
    pub fn refresh_manifest(&mut self, source: Source) -> Result<bool, StorageError> {
        let uploader = self.uploader(source, false)?;
        let frame = uploader.read()?;
        let entry = ManifestEntry {
            file: source.curated_file().to_string(),
            rows: frame.len(),
            first: frame.index().first().copied(),
            last: frame.index().last().copied(),
            columns: frame.column_names().iter().map(|s| s.to_string()).collect(),
        };

        let changed = self.manifest.record(source.name(), entry);
        if changed {
            self.manifest
                .save(&Manifest::default_path(&self.curated_dir))
                .map_err(|e| StorageError::Parse(e.to_string()))?;
            tracing::info!("Manifest updated to version {}", self.manifest.version);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VALUE;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::tempdir;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_load_with_exogenous() {
        let dir = tempdir().unwrap();
        let bundle = DatasetBundle::open(dir.path()).unwrap();

        let prices = Frame::new(vec![hour(1), hour(2)])
            .with_column(VALUE, vec![100.0, 110.0])
            .unwrap();
        let weather = Frame::new(vec![hour(2)])
            .with_column("Temperature", vec![3.0])
            .unwrap();
        bundle.uploader(Source::EnergyPrice, false).unwrap().upload(&prices).unwrap();
        bundle.uploader(Source::Weather, false).unwrap().upload(&weather).unwrap();

        let frame = bundle
            .load_with_exogenous(Source::EnergyPrice, &[Source::Weather])
            .unwrap();
        assert_eq!(frame.column_names(), vec![VALUE, "WEATHER_Temperature"]);
        assert!(frame.column("WEATHER_Temperature").unwrap()[0].is_nan());
    }

    #[test]
    fn test_refresh_manifest_versions() {
        let dir = tempdir().unwrap();
        let mut bundle = DatasetBundle::open(dir.path()).unwrap();
        let prices = Frame::new(vec![hour(1)]).with_column(VALUE, vec![1.0]).unwrap();
        bundle.uploader(Source::EnergyPrice, false).unwrap().upload(&prices).unwrap();

        assert!(bundle.refresh_manifest(Source::EnergyPrice).unwrap());
        assert!(!bundle.refresh_manifest(Source::EnergyPrice).unwrap());

        let reopened = DatasetBundle::open(dir.path()).unwrap();
        let entry = reopened.manifest().entry("ENERGY_PRICE").unwrap();
        assert_eq!(entry.rows, 1);
        assert_eq!(entry.first, Some(hour(1)));
        assert_eq!(reopened.manifest().version, 1);
    }

    #[test]
    fn test_load_missing_source() {
        let dir = tempdir().unwrap();
        let bundle = DatasetBundle::open(dir.path()).unwrap();
        assert!(matches!(bundle.load(Source::Weather), Err(StorageError::Io(_))));
    }
}
