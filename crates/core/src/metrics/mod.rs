//! Metric records and derived-metric calculations.

pub mod calculator;
pub mod error;
pub mod keys;
pub mod record;

pub use calculator::{InterestRates, InterestSplit, MetricsCalculator};
pub use error::MetricsError;
pub use keys::{MetricKey, UnknownMetricKey, PERSISTED_METRICS};
pub use record::MetricRecord;
