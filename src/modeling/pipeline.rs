//! Ordered chain of feature transformers

use crate::domain::Frame;
use crate::ports::{TransformError, Transformer};

/// Applies transformers in insertion order
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style step insertion
    pub fn step(mut self, transformer: impl Transformer + 'static) -> Self {
        self.steps.push(Box::new(transformer));
        self
    }

    pub fn push(&mut self, transformer: Box<dyn Transformer>) {
        self.steps.push(transformer);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Apply already-fitted steps
    pub fn transform(&self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        for step in &self.steps {
            df = step.transform(&df)?;
        }
        Ok(df)
    }

    /// Fit each step on the output of the previous one, then transform
    pub fn fit_transform(&mut self, x: &Frame) -> Result<Frame, TransformError> {
        let mut df = x.clone();
        for step in self.steps.iter_mut() {
            step.fit(&df)?;
            df = step.transform(&df)?;
            tracing::debug!("Applied {} -> {} columns", step.name(), df.columns().len());
        }
        Ok(df)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VALUE;
    use crate::modeling::transformers::{
        LinearInterpolator, TrendCreator, WeekendIndicatorCreator, TREND, WEEKEND,
    };
    use chrono::NaiveDate;

    fn frame() -> Frame {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let index = (0..3).map(|h| start + chrono::Duration::hours(h)).collect();
        Frame::new(index)
            .with_column(VALUE, vec![1.0, f64::NAN, 3.0])
            .unwrap()
    }

    #[test]
    fn test_steps_run_in_order() {
        let mut pipeline = Pipeline::new()
            .step(LinearInterpolator)
            .step(TrendCreator)
            .step(WeekendIndicatorCreator);
        assert_eq!(pipeline.names(), vec!["interpolate", "trend", "weekend"]);

        let df = pipeline.fit_transform(&frame()).unwrap();
        assert_eq!(df.column_names(), vec![VALUE, TREND, WEEKEND]);
        assert_eq!(df.column(VALUE).unwrap(), &[1.0, 2.0, 3.0]);
        // 2023-01-01 is a Sunday
        assert_eq!(df.column(WEEKEND).unwrap(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        let df = pipeline.transform(&frame()).unwrap();
        assert_eq!(df.column_names(), vec![VALUE]);
    }
}
