//! Source reader port
//!
//! Every reader follows the same pipeline: load a raw table, rename headers
//! with the source registry, apply source-specific formatting (which must
//! produce a canonical `TIME` column), drop columns that are neither numeric
//! nor `TIME`, then parse everything into a sorted `Frame`.

use chrono::NaiveDateTime;
use std::path::Path;
use thiserror::Error;

use crate::domain::{Frame, FrameError, RawTable, SourceMetadata, TIME};

/// Canonical timestamp layout used between formatting and parsing
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    Parse(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}: invalid time '{value}'")]
    InvalidTime { row: usize, value: String },

    #[error("Row {row}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Reads one raw source file into a frame
pub trait SourceReader {
    /// Registry entry this reader applies
    fn metadata(&self) -> &SourceMetadata;

    /// Load the raw file as strings
    fn read_table(&self, path: &Path) -> Result<RawTable, ReadError>;

    /// Source-specific cleaning; must leave a `TIME` column in `TIME_FORMAT`
    fn format(&self, table: RawTable) -> Result<RawTable, ReadError>;

    /// Read and format input data
    fn read(&self, path: &Path) -> Result<Frame, ReadError> {
        let table = self.read_table(path)?;
        let table = rename_columns(table, self.metadata());
        let table = self.format(table)?;
        let table = drop_redundant_columns(table, self.metadata());
        let frame = to_frame(&table, self.metadata())?;

        tracing::debug!(
            "Read {} rows of {} from {}",
            frame.len(),
            self.metadata().source,
            path.display()
        );
        Ok(frame)
    }
}

/// Rename headers using the source rename map
pub fn rename_columns(mut table: RawTable, meta: &SourceMetadata) -> RawTable {
    table.headers = table
        .headers
        .iter()
        .map(|h| meta.rename(h).to_string())
        .collect();
    table
}

/// Keep only numeric columns and `TIME`
pub fn drop_redundant_columns(table: RawTable, meta: &SourceMetadata) -> RawTable {
    let keep: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.as_str() == TIME || meta.is_numeric(h))
        .map(|(i, _)| i)
        .collect();

    let headers = keep.iter().map(|&i| table.headers[i].clone()).collect();
    let rows = table
        .rows
        .iter()
        .map(|r| keep.iter().map(|&i| r.get(i).cloned().unwrap_or_default()).collect())
        .collect();
    RawTable::new(headers, rows)
}

/// Parse a cleaned numeric cell; empty cells are missing values
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

/// Parse the cleaned table into a time-sorted frame
pub fn to_frame(table: &RawTable, meta: &SourceMetadata) -> Result<Frame, ReadError> {
    let time_col = table
        .column_index(TIME)
        .ok_or_else(|| ReadError::MissingColumn(TIME.to_string()))?;

    let index = (0..table.len())
        .map(|row| {
            let value = table.cell(row, time_col);
            NaiveDateTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| {
                ReadError::InvalidTime {
                    row,
                    value: value.to_string(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut frame = Frame::new(index);
    for column in &meta.numeric_columns {
        let col = table
            .column_index(column)
            .ok_or_else(|| ReadError::MissingColumn(column.to_string()))?;

        let values = (0..table.len())
            .map(|row| {
                let cell = table.cell(row, col);
                parse_number(cell).ok_or_else(|| ReadError::InvalidNumber {
                    column: column.to_string(),
                    row,
                    value: cell.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        frame.insert_column(*column, values)?;
    }

    frame.sort_by_index();
    Ok(frame)
}
