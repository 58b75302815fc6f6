//! Data Checker
//!
//! Structural validation of frames before they reach curated storage.
//! Duplicated or unordered timestamps are fatal; gaps are only reported.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use super::frame::Frame;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CheckError {
    #[error("Time index contains duplicated entries: {0:?}")]
    DuplicatedIndex(Vec<NaiveDateTime>),

    #[error("Time index is not sorted at position {0}")]
    NotSorted(usize),

    #[error("Column '{column}' has {got} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
}

/// A run of missing periods in a time index
#[derive(Debug, Clone, PartialEq)]
pub struct Gap {
    /// Last timestamp before the gap
    pub after: NaiveDateTime,
    /// First timestamp after the gap
    pub before: NaiveDateTime,
    /// Number of missing periods
    pub missing: i64,
}

/// Validate a frame's index and column shapes
pub fn check_frame(frame: &Frame) -> Result<(), CheckError> {
    for column in frame.columns() {
        if column.values.len() != frame.len() {
            return Err(CheckError::LengthMismatch {
                column: column.name.clone(),
                expected: frame.len(),
                got: column.values.len(),
            });
        }
    }
    check_index(frame.index())
}

/// Index must be unique and increasing
pub fn check_index(index: &[NaiveDateTime]) -> Result<(), CheckError> {
    let duplicated: Vec<NaiveDateTime> = index
        .windows(2)
        .filter(|w| w[0] == w[1])
        .map(|w| w[1])
        .collect();
    if !duplicated.is_empty() {
        return Err(CheckError::DuplicatedIndex(duplicated));
    }

    if let Some(pos) = index.windows(2).position(|w| w[0] > w[1]) {
        return Err(CheckError::NotSorted(pos + 1));
    }

    Ok(())
}

/// Find runs of missing periods in a sorted index
pub fn find_gaps(index: &[NaiveDateTime], step: Duration) -> Vec<Gap> {
    if step <= Duration::zero() {
        return Vec::new();
    }

    index
        .windows(2)
        .filter_map(|w| {
            let diff = w[1] - w[0];
            if diff > step {
                Some(Gap {
                    after: w[0],
                    before: w[1],
                    missing: diff.num_seconds() / step.num_seconds() - 1,
                })
            } else {
                None
            }
        })
        .collect()
}
