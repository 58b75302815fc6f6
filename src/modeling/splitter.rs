//! Train/test window generation for backtesting
//!
//! Windows are expressed as row positions. A window's cutoff is its last
//! training row; the test rows are `cutoff + h` for each step `h` of the
//! forecast horizon.

use chrono::NaiveDateTime;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::TimeSeries;
use crate::ports::{SplitError, Splitter, Window};

pub const DEFAULT_STEP_LENGTH: usize = 24;
pub const DEFAULT_FRAC: f64 = 0.1;
/// Fixed seed so every model is evaluated on the same sampled windows
pub const DEFAULT_SEED: u64 = 42;

/// Relative horizon `1..=step_length`
pub fn horizon(step_length: usize) -> Vec<usize> {
    (1..=step_length).collect()
}

fn validate(window: usize, step_length: usize, fh: &[usize]) -> Result<(), SplitError> {
    if window == 0 {
        return Err(SplitError::InvalidParameter("window length must be positive".into()));
    }
    if step_length == 0 {
        return Err(SplitError::InvalidParameter("step length must be positive".into()));
    }
    if fh.is_empty() || fh.contains(&0) {
        return Err(SplitError::InvalidParameter(
            "forecast horizon must be non-empty and strictly positive".into(),
        ));
    }
    Ok(())
}

/// Cutoffs `window-1, window-1+step, ...` while the whole horizon fits
fn cutoffs(n: usize, window: usize, step_length: usize, fh: &[usize]) -> Result<Vec<usize>, SplitError> {
    let max_fh = fh.iter().copied().max().unwrap_or(0);
    if n < window + max_fh {
        return Err(SplitError::SeriesTooShort {
            len: n,
            window,
            horizon: max_fh,
        });
    }
    Ok((window - 1..n - max_fh).step_by(step_length).collect())
}

/// Training set grows from the start of the series
#[derive(Debug, Clone)]
pub struct ExpandingWindowSplitter {
    initial_window: usize,
    step_length: usize,
    fh: Vec<usize>,
}

impl ExpandingWindowSplitter {
    pub fn new(initial_window: usize, step_length: usize, fh: Vec<usize>) -> Result<Self, SplitError> {
        validate(initial_window, step_length, &fh)?;
        Ok(Self {
            initial_window,
            step_length,
            fh,
        })
    }

    pub fn initial_window(&self) -> usize {
        self.initial_window
    }

    pub fn step_length(&self) -> usize {
        self.step_length
    }
}

impl Splitter for ExpandingWindowSplitter {
    fn horizon(&self) -> &[usize] {
        &self.fh
    }

    fn split(&self, n: usize) -> Result<Vec<Window>, SplitError> {
        Ok(cutoffs(n, self.initial_window, self.step_length, &self.fh)?
            .into_iter()
            .map(|cutoff| Window {
                train: 0..cutoff + 1,
                test: self.fh.iter().map(|h| cutoff + h).collect(),
            })
            .collect())
    }
}

/// Fixed-length training window moving forward
#[derive(Debug, Clone)]
pub struct SlidingWindowSplitter {
    window_length: usize,
    step_length: usize,
    fh: Vec<usize>,
}

impl SlidingWindowSplitter {
    pub fn new(window_length: usize, step_length: usize, fh: Vec<usize>) -> Result<Self, SplitError> {
        validate(window_length, step_length, &fh)?;
        Ok(Self {
            window_length,
            step_length,
            fh,
        })
    }
}

impl Splitter for SlidingWindowSplitter {
    fn horizon(&self) -> &[usize] {
        &self.fh
    }

    fn split(&self, n: usize) -> Result<Vec<Window>, SplitError> {
        Ok(cutoffs(n, self.window_length, self.step_length, &self.fh)?
            .into_iter()
            .map(|cutoff| Window {
                train: cutoff + 1 - self.window_length..cutoff + 1,
                test: self.fh.iter().map(|h| cutoff + h).collect(),
            })
            .collect())
    }
}

/// Expanding windows, each kept with probability `frac`. Sampling is
/// seeded so repeated runs (and different models) see the same windows.
#[derive(Debug, Clone)]
pub struct TestingSplitter {
    inner: ExpandingWindowSplitter,
    frac: f64,
}

impl TestingSplitter {
    pub fn new(
        initial_window: usize,
        step_length: usize,
        fh: Vec<usize>,
        frac: f64,
    ) -> Result<Self, SplitError> {
        if !(0.0..=1.0).contains(&frac) {
            return Err(SplitError::InvalidParameter(format!(
                "frac must be between 0 and 1, got {}",
                frac
            )));
        }
        Ok(Self {
            inner: ExpandingWindowSplitter::new(initial_window, step_length, fh)?,
            frac,
        })
    }

    pub fn frac(&self) -> f64 {
        self.frac
    }
}

impl Splitter for TestingSplitter {
    fn horizon(&self) -> &[usize] {
        self.inner.horizon()
    }

    fn split(&self, n: usize) -> Result<Vec<Window>, SplitError> {
        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
        Ok(self
            .inner
            .split(n)?
            .into_iter()
            .filter(|_| rng.gen::<f64>() <= self.frac)
            .collect())
    }
}

/// Expanding splitter with horizon `1..=step_length`, or its sampled
/// variant when `testing` is set
pub fn get_splitter(
    initial_window: usize,
    step_length: usize,
    testing: bool,
    frac: f64,
) -> Result<Box<dyn Splitter>, SplitError> {
    let fh = horizon(step_length);
    if testing {
        Ok(Box::new(TestingSplitter::new(initial_window, step_length, fh, frac)?))
    } else {
        Ok(Box::new(ExpandingWindowSplitter::new(initial_window, step_length, fh)?))
    }
}

/// Split a series into train and test parts.
///
/// Rows before `train_start` are dropped. With `train_end` the train part
/// is everything strictly before it; otherwise it is the first `test_len`
/// rows. The test part is the remainder, truncated to `test_len`.
pub fn split_series(
    y: &TimeSeries,
    train_start: Option<NaiveDateTime>,
    train_end: Option<NaiveDateTime>,
    test_len: Option<usize>,
) -> Result<(TimeSeries, TimeSeries), SplitError> {
    let y = match train_start {
        Some(start) => y.filter(|ts| *ts >= start),
        None => y.clone(),
    };

    let boundary = match (train_end, test_len) {
        (None, None) => {
            return Err(SplitError::InvalidParameter(
                "one of train_end or test_len must be specified to split series".into(),
            ))
        }
        (Some(end), _) => y.index().partition_point(|ts| *ts < end),
        (None, Some(len)) => len.min(y.len()),
    };

    let train = y.slice(0..boundary);
    let test_end = match test_len {
        Some(len) => (boundary + len).min(y.len()),
        None => y.len(),
    };
    let test = y.slice(boundary..test_end);
    Ok((train, test))
}
