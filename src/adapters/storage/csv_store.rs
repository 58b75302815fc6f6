//! Curated CSV storage
//!
//! Frames are stored as `TIME,<column>,...` with timestamps in
//! `%Y-%m-%d %H:%M:%S` and missing values left empty. Formatting is
//! deterministic so re-writing the same frame yields the same bytes.

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{check_frame, Frame, TIME};
use crate::ports::{reader::parse_number, Storage, StorageError, UploadSummary, TIME_FORMAT};

const EXTENSION: &str = "csv";

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(e) => StorageError::Io(e),
            other => StorageError::Parse(format!("{:?}", other)),
        }
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Write a frame as CSV, creating parent directories
pub fn write_frame_csv(path: &Path, frame: &Frame) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![TIME.to_string()];
    header.extend(frame.column_names().iter().map(|s| s.to_string()));
    writer.write_record(&header)?;

    for (row, ts) in frame.index().iter().enumerate() {
        let mut record = vec![ts.format(TIME_FORMAT).to_string()];
        record.extend(frame.columns().iter().map(|c| format_value(c.values[row])));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a frame written by `write_frame_csv`
pub fn read_frame_csv(path: &Path) -> Result<Frame, StorageError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.first().map(String::as_str) != Some(TIME) {
        return Err(StorageError::Parse(format!(
            "first column of {} must be {}",
            path.display(),
            TIME
        )));
    }

    let mut index = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len() - 1];
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let ts = NaiveDateTime::parse_from_str(record.get(0).unwrap_or(""), TIME_FORMAT)
            .map_err(|e| StorageError::Parse(format!("row {}: {}", line + 1, e)))?;
        index.push(ts);

        for (i, values) in columns.iter_mut().enumerate() {
            let cell = record.get(i + 1).unwrap_or("");
            let value = parse_number(cell).ok_or_else(|| {
                StorageError::Parse(format!("row {}: invalid number '{}'", line + 1, cell))
            })?;
            values.push(value);
        }
    }

    let mut frame = Frame::new(index);
    for (name, values) in headers.into_iter().skip(1).zip(columns) {
        frame
            .insert_column(name, values)
            .map_err(|e| StorageError::Parse(e.to_string()))?;
    }
    Ok(frame)
}

/// Appends new rows of a frame to a curated CSV file
#[derive(Debug, Clone)]
pub struct CsvUploader {
    path: PathBuf,
    backup: bool,
}

impl CsvUploader {
    /// Create an uploader; the path must have a `.csv` extension.
    /// With `backup` on, an existing file is copied to `<name>_copy.csv`
    /// before it is overwritten.
    pub fn new(path: impl Into<PathBuf>, backup: bool) -> Result<Self, StorageError> {
        let path = path.into();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            return Err(StorageError::InvalidExtension {
                expected: EXTENSION,
                path: path.display().to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path, backup })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup copy
    pub fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        self.path.with_file_name(format!("{}_copy.{}", stem, EXTENSION))
    }
}

impl Storage for CsvUploader {
    fn read(&self) -> Result<Frame, StorageError> {
        read_frame_csv(&self.path)
    }

    fn upload(&self, data: &Frame) -> Result<UploadSummary, StorageError> {
        let mut data = data.clone();
        data.sort_by_index();
        check_frame(&data)?;

        let exists = self.exists();
        let existing = if exists {
            self.read()?
        } else {
            Frame::default()
        };

        let new = data.filter_rows(|ts| existing.position(ts).is_none());
        let mut merged = existing.concat(&new);
        merged.sort_by_index();
        check_frame(&merged)?;

        if exists && self.backup {
            fs::copy(&self.path, self.backup_path())?;
        }
        write_frame_csv(&self.path, &merged)?;

        let summary = UploadSummary {
            existing_rows: existing.len(),
            appended_rows: new.len(),
            total_rows: merged.len(),
        };
        tracing::info!(
            "Uploaded {} new rows to {} ({} total)",
            summary.appended_rows,
            self.path.display(),
            summary.total_rows
        );
        Ok(summary)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}
