//! Modeling Layer - Features, splitters, forecasters and backtesting
//!
//! - `transformers`: calendar, trend, lag and cleaning features
//! - `pipeline`: ordered chain of transformers
//! - `splitter`: expanding, sliding and sampled backtest windows
//! - `forecasters`: naive (seasonal) baseline models
//! - `metrics`: MAPE, MAE, RMSE, MSE
//! - `backtesting`: window-by-window model evaluation

pub mod transformers;
pub mod pipeline;
pub mod splitter;
pub mod forecasters;
pub mod metrics;
pub mod backtesting;

pub use transformers::{
    DayOfWeekIndicatorCreator, DayOffIndicatorCreator, LagCreator, LinearInterpolator,
    OutlierFlagCreator, SeasonIndicatorCreator, TrendCreator, WeekendIndicatorCreator,
};
pub use pipeline::Pipeline;
pub use splitter::{
    get_splitter, split_series, ExpandingWindowSplitter, SlidingWindowSplitter, TestingSplitter,
};
pub use forecasters::{default_models, model_by_name, NaiveForecaster, Strategy};
pub use metrics::{default_metrics, Metric, MetricError};
pub use backtesting::{BacktestError, Backtester, ErrorTable, ForecastTable};
