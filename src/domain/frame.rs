//! Time-indexed tables
//!
//! `Frame` is the in-memory shape of every dataset in the crate: one
//! `NaiveDateTime` index and any number of named `f64` columns of the same
//! length. Missing observations are stored as `NaN`.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

/// Name of the time index when a frame is written to disk
pub const TIME: &str = "TIME";
/// Target column of every price/demand source
pub const VALUE: &str = "VALUE";
/// Day-ahead forecast column of the demand source
pub const FORECAST: &str = "FORECAST";
/// Ground truth column of a forecast table
pub const ACTUAL: &str = "ACTUAL";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("Column '{column}' has {got} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Column '{0}' not found")]
    MissingColumn(String),
}

/// A single named column
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Time-indexed table of numeric columns
#[derive(Debug, Clone, Default)]
pub struct Frame {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl Frame {
    /// Create a frame with the given index and no columns
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Builder-style column insertion
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, FrameError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Insert a column, replacing an existing one with the same name
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), FrameError> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                got: values.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column by name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Values of a column, or `MissingColumn`
    pub fn require(&self, name: &str) -> Result<&[f64], FrameError> {
        self.column(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.values)
    }

    /// Remove a column, returning its values
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<f64>> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos).values)
    }

    /// Keep only the listed columns (in their current order)
    pub fn retain_columns(&mut self, keep: &[&str]) {
        self.columns.retain(|c| keep.contains(&c.name.as_str()));
    }

    /// Extract one column as a time series
    pub fn series(&self, name: &str) -> Result<TimeSeries, FrameError> {
        let values = self.require(name)?.to_vec();
        TimeSeries::new(name, self.index.clone(), values)
    }

    /// Position of a timestamp in a sorted index
    pub fn position(&self, ts: &NaiveDateTime) -> Option<usize> {
        self.index.binary_search(ts).ok()
    }

    /// Sort rows by timestamp, keeping row contents together
    pub fn sort_by_index(&mut self) {
        if self.index.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }
        let mut order: Vec<usize> = (0..self.index.len()).collect();
        order.sort_by_key(|&i| self.index[i]);
        self.reorder(&order);
    }

    /// Frame restricted to a contiguous row range
    pub fn slice(&self, range: Range<usize>) -> Frame {
        let range = range.start.min(self.len())..range.end.min(self.len());
        Frame {
            index: self.index[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[range.clone()].to_vec(),
                })
                .collect(),
        }
    }

    /// Frame restricted to rows whose timestamp passes the predicate
    pub fn filter_rows<F>(&self, keep: F) -> Frame
    where
        F: Fn(&NaiveDateTime) -> bool,
    {
        let rows: Vec<usize> = (0..self.len()).filter(|&i| keep(&self.index[i])).collect();
        self.take_rows(&rows)
    }

    /// Append rows from another frame. Columns are aligned by name; columns
    /// missing on either side are filled with NaN.
    pub fn concat(&self, other: &Frame) -> Frame {
        let mut names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        for c in &other.columns {
            if !names.contains(&c.name) {
                names.push(c.name.clone());
            }
        }

        let mut index = self.index.clone();
        index.extend_from_slice(&other.index);

        let columns = names
            .into_iter()
            .map(|name| {
                let mut values = match self.column(&name) {
                    Some(v) => v.to_vec(),
                    None => vec![f64::NAN; self.len()],
                };
                match other.column(&name) {
                    Some(v) => values.extend_from_slice(v),
                    None => values.extend(std::iter::repeat(f64::NAN).take(other.len())),
                }
                Column { name, values }
            })
            .collect();

        Frame { index, columns }
    }

    /// Left join on timestamp. Columns of `other` are added with `prefix`
    /// prepended; rows without a match get NaN.
    pub fn left_join(&self, other: &Frame, prefix: &str) -> Result<Frame, FrameError> {
        let lookup: HashMap<NaiveDateTime, usize> = other
            .index
            .iter()
            .enumerate()
            .map(|(i, ts)| (*ts, i))
            .collect();

        let mut joined = self.clone();
        for c in &other.columns {
            let values = self
                .index
                .iter()
                .map(|ts| lookup.get(ts).map_or(f64::NAN, |&i| c.values[i]))
                .collect();
            joined.insert_column(format!("{}{}", prefix, c.name), values)?;
        }
        Ok(joined)
    }

    fn take_rows(&self, rows: &[usize]) -> Frame {
        Frame {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }

    fn reorder(&mut self, order: &[usize]) {
        *self = self.take_rows(order);
    }
}

/// A single named series on a time index
#[derive(Debug, Clone)]
pub struct TimeSeries {
    name: String,
    index: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(
        name: impl Into<String>,
        index: Vec<NaiveDateTime>,
        values: Vec<f64>,
    ) -> Result<Self, FrameError> {
        let name = name.into();
        if index.len() != values.len() {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: index.len(),
                got: values.len(),
            });
        }
        Ok(Self { name, index, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a timestamp, if present
    pub fn get(&self, ts: &NaiveDateTime) -> Option<f64> {
        self.index.binary_search(ts).ok().map(|i| self.values[i])
    }

    /// Sub-series over a contiguous row range
    pub fn slice(&self, range: Range<usize>) -> TimeSeries {
        let range = range.start.min(self.len())..range.end.min(self.len());
        TimeSeries {
            name: self.name.clone(),
            index: self.index[range.clone()].to_vec(),
            values: self.values[range].to_vec(),
        }
    }

    /// Sub-series of the rows whose timestamp passes the predicate
    pub fn filter<F>(&self, keep: F) -> TimeSeries
    where
        F: Fn(&NaiveDateTime) -> bool,
    {
        let (index, values) = self
            .index
            .iter()
            .zip(&self.values)
            .filter(|(ts, _)| keep(ts))
            .map(|(ts, v)| (*ts, *v))
            .unzip();
        TimeSeries {
            name: self.name.clone(),
            index,
            values,
        }
    }

    /// Single-column frame with this series
    pub fn to_frame(&self) -> Frame {
        Frame {
            index: self.index.clone(),
            columns: vec![Column {
                name: self.name.clone(),
                values: self.values.clone(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_insert_column_length_mismatch() {
        let mut frame = Frame::new(vec![ts(1, 0), ts(1, 1)]);
        let err = frame.insert_column(VALUE, vec![1.0]).unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 2, got: 1, .. }));
    }

    #[test]
    fn test_insert_column_replaces() {
        let mut frame = Frame::new(vec![ts(1, 0)]);
        frame.insert_column(VALUE, vec![1.0]).unwrap();
        frame.insert_column(VALUE, vec![2.0]).unwrap();
        assert_eq!(frame.columns().len(), 1);
        assert_eq!(frame.column(VALUE), Some(&[2.0][..]));
    }

    #[test]
    fn test_sort_by_index_keeps_rows_together() {
        let mut frame = Frame::new(vec![ts(2, 0), ts(1, 0), ts(3, 0)])
            .with_column(VALUE, vec![2.0, 1.0, 3.0])
            .unwrap();
        frame.sort_by_index();
        assert_eq!(frame.index(), &[ts(1, 0), ts(2, 0), ts(3, 0)]);
        assert_eq!(frame.column(VALUE).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_concat_aligns_columns() {
        let a = Frame::new(vec![ts(1, 0)]).with_column("A", vec![1.0]).unwrap();
        let b = Frame::new(vec![ts(1, 1)]).with_column("B", vec![2.0]).unwrap();
        let c = a.concat(&b);

        assert_eq!(c.len(), 2);
        assert_eq!(c.column_names(), vec!["A", "B"]);
        assert!(c.column("A").unwrap()[1].is_nan());
        assert!(c.column("B").unwrap()[0].is_nan());
    }

    #[test]
    fn test_left_join_fills_missing() {
        let base = Frame::new(vec![ts(1, 0), ts(1, 1)])
            .with_column(VALUE, vec![10.0, 11.0])
            .unwrap();
        let other = Frame::new(vec![ts(1, 1)])
            .with_column("Temperature", vec![5.0])
            .unwrap();

        let joined = base.left_join(&other, "WEATHER_").unwrap();
        let temp = joined.column("WEATHER_Temperature").unwrap();
        assert!(temp[0].is_nan());
        assert_eq!(temp[1], 5.0);
    }

    #[test]
    fn test_series_filter_and_get() {
        let series = TimeSeries::new(VALUE, vec![ts(1, 0), ts(2, 0), ts(3, 0)], vec![1.0, 2.0, 3.0])
            .unwrap();
        let tail = series.filter(|t| *t >= ts(2, 0));
        assert_eq!(tail.values(), &[2.0, 3.0]);
        assert_eq!(series.get(&ts(3, 0)), Some(3.0));
        assert_eq!(series.get(&ts(4, 0)), None);
    }
}
