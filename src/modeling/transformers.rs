//! Feature Transformers
//!
//! Calendar indicators, trend, lags and cleaning steps applied to the
//! curated price frame. Every transformer returns a new frame and leaves
//! its input untouched.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use statrs::statistics::{Data, Median};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::domain::{Frame, VALUE};
use crate::ports::{TransformError, Transformer};

pub const TREND: &str = "TREND";
pub const WEEKEND: &str = "WEEKEND";
pub const IS_DAY_OFF: &str = "Is_Day_Off";
pub const OUTLIER: &str = "OUTLIER";

/// Default Hampel window: one week of hourly data
pub const DEFAULT_OUTLIER_WINDOW: usize = 24 * 7;
/// Scale factor turning MAD into a standard deviation estimate
pub const MAD_SCALE: f64 = 1.4826;
pub const DEFAULT_N_SIGMA: f64 = 3.0;

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

fn is_weekend(ts: &NaiveDateTime) -> bool {
    matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

/// One-hot encode labels. Categories are sorted alphabetically and the
/// first one is dropped.
fn add_dummies(frame: &mut Frame, labels: &[String]) -> Result<(), TransformError> {
    let categories: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
    for category in categories.into_iter().skip(1) {
        let values = labels.iter().map(|l| indicator(l == category)).collect();
        frame.insert_column(category, values)?;
    }
    Ok(())
}

/// Adds `TREND` = 0, 1, 2, ...
#[derive(Debug, Clone, Default)]
pub struct TrendCreator;

impl Transformer for TrendCreator {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        df.insert_column(TREND, (0..x.len()).map(|i| i as f64).collect())?;
        Ok(df)
    }
}

/// Adds `WEEKEND` = 1 on Saturdays and Sundays
#[derive(Debug, Clone, Default)]
pub struct WeekendIndicatorCreator;

impl Transformer for WeekendIndicatorCreator {
    fn name(&self) -> &'static str {
        "weekend"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        df.insert_column(WEEKEND, x.index().iter().map(|ts| indicator(is_weekend(ts))).collect())?;
        Ok(df)
    }
}

/// Adds one indicator column per day name (`Monday`, ...) present in the
/// index, minus the alphabetically first one
#[derive(Debug, Clone, Default)]
pub struct DayOfWeekIndicatorCreator;

impl Transformer for DayOfWeekIndicatorCreator {
    fn name(&self) -> &'static str {
        "day_of_week"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        let days: Vec<String> = x.index().iter().map(|ts| ts.format("%A").to_string()).collect();
        add_dummies(&mut df, &days)?;
        Ok(df)
    }
}

/// Astronomical-ish season of a timestamp
pub fn season(ts: &NaiveDateTime) -> &'static str {
    // compare within a leap year so 29 Feb maps cleanly
    let Some(date) = NaiveDate::from_ymd_opt(2000, ts.month(), ts.day()) else {
        return "Winter";
    };
    let at = date.and_time(ts.time());
    let boundary = |m, d| {
        NaiveDate::from_ymd_opt(2000, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(at)
    };

    if at < boundary(3, 21) || at > boundary(12, 22) {
        "Winter"
    } else if at < boundary(6, 22) {
        "Spring"
    } else if at < boundary(9, 23) {
        "Summer"
    } else {
        "Autumn"
    }
}

/// Adds season indicators (`Spring`, `Summer`, `Winter`; `Autumn` is the
/// dropped baseline when present)
#[derive(Debug, Clone, Default)]
pub struct SeasonIndicatorCreator;

impl Transformer for SeasonIndicatorCreator {
    fn name(&self) -> &'static str {
        "season"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        let seasons: Vec<String> = x.index().iter().map(|ts| season(ts).to_string()).collect();
        add_dummies(&mut df, &seasons)?;
        Ok(df)
    }
}

/// Adds `Is_Day_Off` = 1 on public holidays and weekends
#[derive(Debug, Clone, Default)]
pub struct DayOffIndicatorCreator {
    holidays: HashSet<NaiveDate>,
    source: Option<PathBuf>,
}

impl DayOffIndicatorCreator {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            source: None,
        }
    }

    /// Load holidays from a CSV with a `Date` column
    pub fn from_file(path: &Path) -> Result<Self, TransformError> {
        let holidays_err = |e: &dyn std::fmt::Display| {
            TransformError::Holidays(format!("{}: {}", path.display(), e))
        };

        let mut reader = csv::Reader::from_path(path).map_err(|e| holidays_err(&e))?;
        let column = reader
            .headers()
            .map_err(|e| holidays_err(&e))?
            .iter()
            .position(|h| h.trim() == "Date")
            .ok_or_else(|| holidays_err(&"missing Date column"))?;

        let mut holidays = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|e| holidays_err(&e))?;
            let cell = record.get(column).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            // dates may carry a time part
            let date = NaiveDate::parse_from_str(cell.get(..10).unwrap_or(cell), "%Y-%m-%d")
                .map_err(|e| holidays_err(&format!("'{}' {}", cell, e)))?;
            holidays.insert(date);
        }

        tracing::debug!("Loaded {} holidays from {}", holidays.len(), path.display());
        Ok(Self {
            holidays,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn holidays(&self) -> &HashSet<NaiveDate> {
        &self.holidays
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_day_off(&self, ts: &NaiveDateTime) -> bool {
        self.holidays.contains(&ts.date()) || is_weekend(ts)
    }
}

impl Transformer for DayOffIndicatorCreator {
    fn name(&self) -> &'static str {
        "day_off"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        let values = x.index().iter().map(|ts| indicator(self.is_day_off(ts))).collect();
        df.insert_column(IS_DAY_OFF, values)?;
        Ok(df)
    }
}

/// Linear interpolation of missing values. Leading gaps stay missing;
/// trailing gaps take the last valid value.
pub fn interpolate_linear(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    let mut last_valid: Option<usize> = None;

    for i in 0..out.len() {
        if out[i].is_nan() {
            continue;
        }
        if let Some(prev) = last_valid {
            let gap = i - prev;
            if gap > 1 {
                let step = (out[i] - out[prev]) / gap as f64;
                for j in prev + 1..i {
                    out[j] = out[prev] + step * (j - prev) as f64;
                }
            }
        }
        last_valid = Some(i);
    }

    if let Some(prev) = last_valid {
        let fill = out[prev];
        for v in out.iter_mut().skip(prev + 1) {
            *v = fill;
        }
    }
    out
}

/// Fills gaps in `VALUE` by linear interpolation
#[derive(Debug, Clone, Default)]
pub struct LinearInterpolator;

impl Transformer for LinearInterpolator {
    fn name(&self) -> &'static str {
        "interpolate"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        let values = interpolate_linear(x.require(VALUE)?);
        df.insert_column(VALUE, values)?;
        Ok(df)
    }
}

/// Hampel filter: a point is an outlier when it lies more than
/// `n_sigma * k * MAD` from the median of its centered window.
/// Windows are truncated at the edges of the series.
pub fn hampel_outliers(values: &[f64], window_length: usize, n_sigma: f64, k: f64) -> Vec<bool> {
    let half = window_length / 2;
    (0..values.len())
        .map(|i| {
            let x = values[i];
            if x.is_nan() {
                return false;
            }
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(values.len());
            let window: Vec<f64> = values[start..end].iter().copied().filter(|v| !v.is_nan()).collect();

            let median = Data::new(window.clone()).median();
            let deviations: Vec<f64> = window.iter().map(|v| (v - median).abs()).collect();
            let sigma = k * Data::new(deviations).median();

            (x - median).abs() > n_sigma * sigma
        })
        .collect()
}

/// Detects outliers in `VALUE` with a Hampel filter. With `return_bool`
/// an `OUTLIER` flag column is added; otherwise outliers in `VALUE` are
/// replaced by NaN.
#[derive(Debug, Clone)]
pub struct OutlierFlagCreator {
    window_length: usize,
    return_bool: bool,
    n_sigma: f64,
}

impl Default for OutlierFlagCreator {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_OUTLIER_WINDOW,
            return_bool: true,
            n_sigma: DEFAULT_N_SIGMA,
        }
    }
}

impl OutlierFlagCreator {
    pub fn new(window_length: Option<usize>, return_bool: bool) -> Result<Self, TransformError> {
        let window_length = window_length.unwrap_or(DEFAULT_OUTLIER_WINDOW);
        if window_length < 3 {
            return Err(TransformError::InvalidParameter(format!(
                "outlier window must be at least 3, got {}",
                window_length
            )));
        }
        Ok(Self {
            window_length,
            return_bool,
            ..Self::default()
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }
}

impl Transformer for OutlierFlagCreator {
    fn name(&self) -> &'static str {
        "outliers"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        let values = x.require(VALUE)?;
        let flags = hampel_outliers(values, self.window_length, self.n_sigma, MAD_SCALE);

        if self.return_bool {
            df.insert_column(OUTLIER, flags.iter().map(|&f| indicator(f)).collect())?;
        } else {
            let cleaned = values
                .iter()
                .zip(&flags)
                .map(|(&v, &outlier)| if outlier { f64::NAN } else { v })
                .collect();
            df.insert_column(VALUE, cleaned)?;
        }

        let count = flags.iter().filter(|&&f| f).count();
        tracing::debug!("Hampel filter found {} outliers in {} rows", count, flags.len());
        Ok(df)
    }
}

/// Adds `VALUE_LAG_<k>` columns (NaN for the first k rows)
#[derive(Debug, Clone)]
pub struct LagCreator {
    lags: Vec<usize>,
}

impl LagCreator {
    pub fn new(lags: Vec<usize>) -> Result<Self, TransformError> {
        if lags.iter().any(|&l| l == 0) {
            return Err(TransformError::InvalidParameter("lags must be positive".to_string()));
        }
        Ok(Self { lags })
    }

    pub fn column_name(lag: usize) -> String {
        format!("{}_LAG_{}", VALUE, lag)
    }
}

impl Transformer for LagCreator {
    fn name(&self) -> &'static str {
        "lags"
    }

    fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        let values = x.require(VALUE)?;
        for &lag in &self.lags {
            let shifted = (0..values.len())
                .map(|i| if i < lag { f64::NAN } else { values[i - lag] })
                .collect();
            df.insert_column(Self::column_name(lag), shifted)?;
        }
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hours_from(date: NaiveDate, n: usize) -> Vec<NaiveDateTime> {
        let start = date.and_hms_opt(0, 0, 0).unwrap();
        (0..n)
            .map(|h| start + chrono::Duration::hours(h as i64))
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn frame(values: Vec<f64>) -> Frame {
        // 2023-01-06 is a Friday
        Frame::new(hours_from(date(2023, 1, 6), values.len()))
            .with_column(VALUE, values)
            .unwrap()
    }

    #[test]
    fn test_trend() {
        let df = TrendCreator.transform(&frame(vec![5.0, 6.0, 7.0])).unwrap();
        assert_eq!(df.column(TREND).unwrap(), &[0.0, 1.0, 2.0]);
        assert_eq!(df.column(VALUE).unwrap(), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_weekend_indicator() {
        let index = vec![
            date(2023, 1, 6).and_hms_opt(12, 0, 0).unwrap(),
            date(2023, 1, 7).and_hms_opt(12, 0, 0).unwrap(),
            date(2023, 1, 8).and_hms_opt(12, 0, 0).unwrap(),
            date(2023, 1, 9).and_hms_opt(12, 0, 0).unwrap(),
        ];
        let df = WeekendIndicatorCreator.transform(&Frame::new(index)).unwrap();
        assert_eq!(df.column(WEEKEND).unwrap(), &[0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_day_of_week_drops_first_alphabetical() {
        // Friday, Saturday, Sunday
        let index: Vec<_> = (6..=8).map(|d| date(2023, 1, d).and_hms_opt(0, 0, 0).unwrap()).collect();
        let df = DayOfWeekIndicatorCreator.transform(&Frame::new(index)).unwrap();
        assert_eq!(df.column_names(), vec!["Saturday", "Sunday"]);
        assert_eq!(df.column("Saturday").unwrap(), &[0.0, 1.0, 0.0]);
        assert_eq!(df.column("Sunday").unwrap(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_season_boundaries() {
        let at = |m, d, h| date(2023, m, d).and_hms_opt(h, 0, 0).unwrap();
        assert_eq!(season(&at(3, 20, 23)), "Winter");
        assert_eq!(season(&at(3, 21, 0)), "Spring");
        assert_eq!(season(&at(6, 22, 0)), "Summer");
        assert_eq!(season(&at(9, 22, 23)), "Summer");
        assert_eq!(season(&at(9, 23, 0)), "Autumn");
        assert_eq!(season(&at(12, 22, 0)), "Autumn");
        assert_eq!(season(&at(12, 22, 1)), "Winter");
        assert_eq!(season(&date(2024, 2, 29).and_hms_opt(0, 0, 0).unwrap()), "Winter");
    }

    #[test]
    fn test_season_dummies() {
        let index = vec![
            date(2023, 1, 1).and_hms_opt(0, 0, 0).unwrap(),
            date(2023, 4, 1).and_hms_opt(0, 0, 0).unwrap(),
            date(2023, 10, 1).and_hms_opt(0, 0, 0).unwrap(),
        ];
        let df = SeasonIndicatorCreator.transform(&Frame::new(index)).unwrap();
        assert_eq!(df.column_names(), vec!["Spring", "Winter"]);
        assert_eq!(df.column("Winter").unwrap(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_day_off_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Date,Name").unwrap();
        writeln!(file, "2023-01-06,Epiphany").unwrap();
        file.flush().unwrap();

        let creator = DayOffIndicatorCreator::from_file(file.path()).unwrap();
        assert_eq!(creator.holidays().len(), 1);

        // Friday (holiday), Saturday, Sunday, Monday
        let index: Vec<_> = (6..=9).map(|d| date(2023, 1, d).and_hms_opt(10, 0, 0).unwrap()).collect();
        let df = creator.transform(&Frame::new(index)).unwrap();
        assert_eq!(df.column(IS_DAY_OFF).unwrap(), &[1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_day_off_missing_date_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Day,Name").unwrap();
        file.flush().unwrap();
        let err = DayOffIndicatorCreator::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TransformError::Holidays(_)));
    }

    #[test]
    fn test_interpolate_linear() {
        let out = interpolate_linear(&[f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0, f64::NAN]);
        assert!(out[0].is_nan());
        assert_relative_eq!(out[2], 2.0);
        assert_relative_eq!(out[3], 3.0);
        assert_relative_eq!(out[5], 4.0);
    }

    #[test]
    fn test_linear_interpolator_requires_value() {
        let df = Frame::new(hours_from(date(2023, 1, 1), 2));
        assert!(matches!(
            LinearInterpolator.transform(&df),
            Err(TransformError::Frame(_))
        ));
    }

    #[test]
    fn test_hampel_flags_spike() {
        let mut values: Vec<f64> = (0..50).map(|i| 10.0 + (i % 3) as f64).collect();
        values[25] = 500.0;
        let flags = hampel_outliers(&values, 11, DEFAULT_N_SIGMA, MAD_SCALE);
        assert!(flags[25]);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
    }

    #[test]
    fn test_outlier_creator_replaces_with_nan() {
        let mut values: Vec<f64> = (0..30).map(|i| 10.0 + (i % 2) as f64).collect();
        values[10] = -300.0;
        let creator = OutlierFlagCreator::new(Some(7), false).unwrap();
        let df = creator.transform(&frame(values)).unwrap();
        assert!(df.column(VALUE).unwrap()[10].is_nan());
        assert!(!df.has_column(OUTLIER));
    }

    #[test]
    fn test_outlier_creator_rejects_tiny_window() {
        assert!(OutlierFlagCreator::new(Some(1), true).is_err());
        assert_eq!(OutlierFlagCreator::default().window_length(), 168);
    }

    #[test]
    fn test_lag_creator() {
        let lags = LagCreator::new(vec![1, 2]).unwrap();
        let df = lags.transform(&frame(vec![1.0, 2.0, 3.0])).unwrap();
        let lag1 = df.column("VALUE_LAG_1").unwrap();
        assert!(lag1[0].is_nan());
        assert_eq!(&lag1[1..], &[1.0, 2.0]);
        let lag2 = df.column("VALUE_LAG_2").unwrap();
        assert_eq!(lag2[2], 1.0);
        assert!(LagCreator::new(vec![0]).is_err());
    }

    #[test]
    fn test_transformers_are_deterministic() {
        let input = frame((0..48).map(|i| (i as f64).sin()).collect());
        let a = SeasonIndicatorCreator.transform(&TrendCreator.transform(&input).unwrap()).unwrap();
        let b = SeasonIndicatorCreator.transform(&TrendCreator.transform(&input).unwrap()).unwrap();
        assert_eq!(a.column_names(), b.column_names());
        for name in a.column_names() {
            assert_eq!(a.column(name), b.column(name));
        }
    }
}
