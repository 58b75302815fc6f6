//! PSE Report Reader
//!
//! Reads `;`-separated reports published by the Polish transmission system
//! operator (settlement prices, demand). Hours run 1..=24 with `24`
//! meaning midnight of the following day; on the last Sunday of October the
//! repeated 2 AM hour is marked with `A` and dropped.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::path::Path;

use super::csv_file::load_delimited;
use crate::domain::{RawTable, Source, SourceMetadata, DATE, HOUR, TIME};
use crate::ports::{ReadError, SourceReader, TIME_FORMAT};

/// Marker of the duplicated hour at the autumn DST switch
const TIMEZONE_MARK: char = 'A';
const SEPARATOR: u8 = b';';
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// Reader for PSE hourly reports
#[derive(Debug, Clone)]
pub struct PseReader {
    meta: SourceMetadata,
}

impl PseReader {
    pub fn new(source: Source) -> Self {
        Self {
            meta: source.metadata(),
        }
    }

    fn required_column(table: &RawTable, name: &str) -> Result<usize, ReadError> {
        table
            .column_index(name)
            .ok_or_else(|| ReadError::MissingColumn(name.to_string()))
    }

    fn entry_time(row: usize, date: &str, hour: &str) -> Result<NaiveDateTime, ReadError> {
        let invalid = || ReadError::InvalidTime {
            row,
            value: format!("{} {}", date, hour),
        };

        let date = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date.trim(), fmt).ok())
            .ok_or_else(invalid)?;
        let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;

        match hour {
            // midnight belongs to the following day
            24 => Ok((date + Duration::days(1)).and_time(NaiveTime::MIN)),
            0..=23 => date.and_hms_opt(hour, 0, 0).ok_or_else(invalid),
            _ => Err(invalid()),
        }
    }
}

/// Clean a PSE number: drop spaces and NBSP, decimal comma to dot.
/// A lone dash marks a missing value.
pub fn clean_number(cell: &str) -> String {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned == "-" {
        String::new()
    } else {
        cleaned
    }
}

impl SourceReader for PseReader {
    fn metadata(&self) -> &SourceMetadata {
        &self.meta
    }

    fn read_table(&self, path: &Path) -> Result<RawTable, ReadError> {
        load_delimited(path, SEPARATOR)
    }

    fn format(&self, mut table: RawTable) -> Result<RawTable, ReadError> {
        let date_col = Self::required_column(&table, DATE)?;
        let hour_col = Self::required_column(&table, HOUR)?;

        let before = table.len();
        table.retain_rows(|row| {
            !row.get(hour_col)
                .map_or(false, |h| h.contains(TIMEZONE_MARK))
        });
        if table.len() < before {
            tracing::debug!("Dropped {} timezone shift entries", before - table.len());
        }

        let times = (0..table.len())
            .map(|row| {
                Self::entry_time(row, table.cell(row, date_col), table.cell(row, hour_col))
                    .map(|t| t.format(TIME_FORMAT).to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        table.set_column(TIME, times);

        for column in &self.meta.numeric_columns {
            let col = Self::required_column(&table, column)?;
            table.map_column(col, clean_number);
        }

        Ok(table)
    }
}
