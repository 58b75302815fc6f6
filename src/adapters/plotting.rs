//! Forecast charts
//!
//! Draws actuals against a model's forecast as a PNG. Values are resampled
//! to the requested frequency (mean per bucket) before drawing. The chart
//! carries no text so it renders without a font backend.

use chrono::{NaiveDateTime, Timelike};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

use crate::domain::Frequency;

const SIZE: (u32, u32) = (1280, 720);
const ORANGE: RGBColor = RGBColor(255, 165, 0);

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Nothing to plot")]
    Empty,

    #[error("Series lengths differ: index {index}, actual {actual}, forecast {forecast}")]
    LengthMismatch {
        index: usize,
        actual: usize,
        forecast: usize,
    },

    #[error("Drawing failed: {0}")]
    Drawing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn bucket(ts: NaiveDateTime, freq: Frequency) -> NaiveDateTime {
    match freq {
        Frequency::Hourly => ts.date().and_hms_opt(ts.hour(), 0, 0).unwrap_or(ts),
        Frequency::Daily => ts.date().and_hms_opt(0, 0, 0).unwrap_or(ts),
    }
}

/// Mean of each frequency bucket, NaNs skipped. Every bucket between the
/// first and last timestamp is emitted; one with no valid value yields NaN.
pub fn resample_mean(
    index: &[NaiveDateTime],
    values: &[f64],
    freq: Frequency,
) -> (Vec<NaiveDateTime>, Vec<f64>) {
    let mut buckets: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();
    for (ts, value) in index.iter().zip(values) {
        let entry = buckets.entry(bucket(*ts, freq)).or_insert((0.0, 0));
        if !value.is_nan() {
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return (Vec::new(), Vec::new());
    };

    let mut out = (Vec::new(), Vec::new());
    let mut ts = first;
    while ts <= last {
        let mean = match buckets.get(&ts) {
            Some(&(sum, count)) if count > 0 => sum / count as f64,
            _ => f64::NAN,
        };
        out.0.push(ts);
        out.1.push(mean);
        ts += freq.step();
    }
    out
}

/// Write a chart of `actual` (blue) and `forecast` (orange) to `path`.
/// `rows` restricts the chart to a row range of the inputs.
pub fn plot_forecast(
    path: &Path,
    index: &[NaiveDateTime],
    actual: &[f64],
    forecast: &[f64],
    freq: Frequency,
    rows: Option<Range<usize>>,
) -> Result<(), PlotError> {
    if index.len() != actual.len() || index.len() != forecast.len() {
        return Err(PlotError::LengthMismatch {
            index: index.len(),
            actual: actual.len(),
            forecast: forecast.len(),
        });
    }

    let rows = rows.unwrap_or(0..index.len());
    let rows = rows.start.min(index.len())..rows.end.min(index.len());
    let (_, actual) = resample_mean(&index[rows.clone()], &actual[rows.clone()], freq);
    let (_, forecast) = resample_mean(&index[rows.clone()], &forecast[rows], freq);

    let finite = || actual.iter().chain(&forecast).copied().filter(|v| v.is_finite());
    let min = finite().fold(f64::INFINITY, f64::min);
    let max = finite().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return Err(PlotError::Empty);
    }
    let pad = ((max - min) * 0.05).max(1.0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let drawing = |e: &dyn std::fmt::Display| PlotError::Drawing(e.to_string());
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| drawing(&e))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(0usize..actual.len().max(2), (min - pad)..(max + pad))
        .map_err(|e| drawing(&e))?;

    for (values, color) in [(&actual, &BLUE), (&forecast, &ORANGE)] {
        // NaN buckets split the line into segments
        for segment in segments(values) {
            chart
                .draw_series(LineSeries::new(segment, color))
                .map_err(|e| drawing(&e))?;
        }
    }

    root.present().map_err(|e| drawing(&e))?;
    tracing::debug!("Saved plot to {}", path.display());
    Ok(())
}

fn segments(values: &[f64]) -> Vec<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() {
            current.push((i, v));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_resample_daily_mean_skips_nan() {
        let index = vec![at(1, 0, 0), at(1, 12, 0), at(1, 23, 0), at(2, 0, 0)];
        let values = vec![1.0, f64::NAN, 3.0, 10.0];
        let (idx, means) = resample_mean(&index, &values, Frequency::Daily);
        assert_eq!(idx, vec![at(1, 0, 0), at(2, 0, 0)]);
        assert_eq!(means, vec![2.0, 10.0]);
    }

    #[test]
    fn test_resample_hourly_keeps_hours() {
        let index = vec![at(1, 0, 0), at(1, 0, 30), at(1, 1, 0)];
        let (idx, means) = resample_mean(&index, &[1.0, 2.0, 5.0], Frequency::Hourly);
        assert_eq!(idx.len(), 2);
        assert_eq!(means, vec![1.5, 5.0]);
    }

    #[test]
    fn test_resample_fills_empty_buckets_with_nan() {
        let index = vec![at(1, 0, 0), at(1, 1, 0), at(4, 0, 0), at(4, 1, 0)];
        let (idx, means) = resample_mean(&index, &[1.0, 3.0, 5.0, 7.0], Frequency::Daily);

        assert_eq!(idx, vec![at(1, 0, 0), at(2, 0, 0), at(3, 0, 0), at(4, 0, 0)]);
        assert_eq!(means[0], 2.0);
        assert!(means[1].is_nan() && means[2].is_nan());
        assert_eq!(means[3], 6.0);
        assert_eq!(segments(&means).len(), 2);
    }

    #[test]
    fn test_resample_empty_input() {
        let (idx, means) = resample_mean(&[], &[], Frequency::Hourly);
        assert!(idx.is_empty() && means.is_empty());
    }

    #[test]
    fn test_segments_split_on_nan() {
        let parts = segments(&[1.0, f64::NAN, 2.0, 3.0]);
        assert_eq!(parts, vec![vec![(0, 1.0)], vec![(2, 2.0), (3, 3.0)]]);
    }

    #[test]
    fn test_plot_forecast_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PLOTS").join("model.png");
        let index: Vec<_> = (0..48).map(|h| at(1 + h / 24, h % 24, 0)).collect();
        let actual: Vec<f64> = (0..48).map(|h| h as f64).collect();
        let forecast: Vec<f64> = (0..48).map(|h| h as f64 + 1.0).collect();

        plot_forecast(&path, &index, &actual, &forecast, Frequency::Hourly, None).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_plot_all_nan_is_empty() {
        let dir = tempdir().unwrap();
        let index = vec![at(1, 0, 0)];
        let err = plot_forecast(
            &dir.path().join("x.png"),
            &index,
            &[f64::NAN],
            &[f64::NAN],
            Frequency::Daily,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PlotError::Empty));
    }
}
