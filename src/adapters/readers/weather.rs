//! Weather Export Reader
//!
//! Reads hourly weather observations exported with imperial units and unit
//! suffixes attached to every value. Values are stripped, converted to
//! Celsius and km/h, and half-hour observations are discarded.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::path::Path;

use super::csv_file::load_delimited;
use crate::domain::{RawTable, Source, SourceMetadata, DATE, TIME};
use crate::ports::{reader::parse_number, ReadError, SourceReader, TIME_FORMAT};

const SEPARATOR: u8 = b',';
const UNITS: [&str; 7] = ["°F", "°%", "°mph", "°in", "\u{a0}", "Â", " "];
const TEMPERATURE: &str = "Temperature";
const WIND_SPEED: &str = "Wind_Speed";
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y%m%d", "%d.%m.%Y", "%m/%d/%Y"];
const TIME_FORMATS: [&str; 3] = ["%I:%M%p", "%H:%M", "%H:%M:%S"];

/// Reader for weather exports
#[derive(Debug, Clone)]
pub struct WeatherReader {
    meta: SourceMetadata,
}

impl Default for WeatherReader {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherReader {
    pub fn new() -> Self {
        Self {
            meta: Source::Weather.metadata(),
        }
    }

    fn entry_time(row: usize, date: &str, time: &str) -> Result<NaiveDateTime, ReadError> {
        let invalid = || ReadError::InvalidTime {
            row,
            value: format!("{} {}", date, time),
        };

        let day = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
            .ok_or_else(invalid)?;
        let clock = TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(&time.to_uppercase(), fmt).ok())
            .ok_or_else(invalid)?;

        Ok(day.and_time(clock))
    }

    fn convert_column<F>(table: &mut RawTable, name: &str, convert: F) -> Result<(), ReadError>
    where
        F: Fn(f64) -> f64,
    {
        let col = table
            .column_index(name)
            .ok_or_else(|| ReadError::MissingColumn(name.to_string()))?;

        for row in 0..table.len() {
            let cell = table.cell(row, col).to_string();
            let value = parse_number(&cell).ok_or_else(|| ReadError::InvalidNumber {
                column: name.to_string(),
                row,
                value: cell.clone(),
            })?;
            if let Some(slot) = table.rows[row].get_mut(col) {
                *slot = if value.is_nan() {
                    String::new()
                } else {
                    convert(value).to_string()
                };
            }
        }
        Ok(())
    }
}

/// Remove unit suffixes and signs from a cell
pub fn remove_units(cell: &str) -> String {
    UNITS
        .iter()
        .fold(cell.to_string(), |acc, unit| acc.replace(unit, ""))
}

/// Fahrenheit to Celsius, rounded to whole degrees
pub fn to_celsius(fahrenheit: f64) -> f64 {
    ((fahrenheit - 32.0) * 5.0 / 9.0).round_ties_even()
}

/// Miles per hour to kilometres per hour, rounded to whole units
pub fn to_kmh(mph: f64) -> f64 {
    (mph * 1.609344).round_ties_even()
}

impl SourceReader for WeatherReader {
    fn metadata(&self) -> &SourceMetadata {
        &self.meta
    }

    fn read_table(&self, path: &Path) -> Result<RawTable, ReadError> {
        load_delimited(path, SEPARATOR)
    }

    fn format(&self, mut table: RawTable) -> Result<RawTable, ReadError> {
        for col in 0..table.headers.len() {
            table.map_column(col, remove_units);
        }

        Self::convert_column(&mut table, TEMPERATURE, to_celsius)?;
        Self::convert_column(&mut table, WIND_SPEED, to_kmh)?;

        let date_col = table
            .column_index(DATE)
            .or_else(|| table.column_index("Date"))
            .ok_or_else(|| ReadError::MissingColumn(DATE.to_string()))?;
        let time_col = table
            .column_index(TIME)
            .ok_or_else(|| ReadError::MissingColumn(TIME.to_string()))?;

        let times = (0..table.len())
            .map(|row| Self::entry_time(row, table.cell(row, date_col), table.cell(row, time_col)))
            .collect::<Result<Vec<_>, _>>()?;

        // only full-hour observations are kept
        let mut kept = RawTable::new(table.headers.clone(), Vec::new());
        let mut kept_times = Vec::new();
        for (row, time) in table.rows.into_iter().zip(times) {
            if time.minute() == 0 {
                kept.rows.push(row);
                kept_times.push(time.format(TIME_FORMAT).to_string());
            }
        }
        kept.set_column(TIME, kept_times);

        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_remove_units() {
        assert_eq!(remove_units("50 °F"), "50");
        assert_eq!(remove_units("12 °mph"), "12");
        assert_eq!(remove_units("1:30 AM"), "1:30AM");
    }

    #[test]
    fn test_unit_conversions() {
        assert_relative_eq!(to_celsius(32.0), 0.0);
        assert_relative_eq!(to_celsius(50.0), 10.0);
        assert_relative_eq!(to_kmh(10.0), 16.0);
    }

    #[test]
    fn test_read_weather() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            "DATE,Time,Temperatura,Prędkość wiatru,Podmuchy wiatru,Wilgotność,Widoczność,Zachmurzenie,Opad atmosferyczny,Condition\n\
             2023-01-01,12:00 AM,50 °F,10 °mph,0 °mph,80 °%,6 °in,1,0.0 °in,Fair\n\
             2023-01-01,12:30 AM,50 °F,10 °mph,0 °mph,80 °%,6 °in,1,0.0 °in,Fair\n\
             2023-01-01,1:00 PM,32 °F,5 °mph,0 °mph,70 °%,6 °in,2,0.1 °in,Cloudy\n"
                .as_bytes(),
        )
        .unwrap();

        let frame = WeatherReader::new().read(file.path()).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(
            frame.index()[1],
            NaiveDate::from_ymd_opt(2023, 1, 1)
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap()
        );
        assert_eq!(frame.column(TEMPERATURE).unwrap(), &[10.0, 0.0]);
        assert_eq!(frame.column(WIND_SPEED).unwrap(), &[16.0, 8.0]);
        assert!(!frame.has_column("Condition"));
    }
}
