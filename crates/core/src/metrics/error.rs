//! Metric derivation errors.

use thiserror::Error;

use super::keys::MetricKey;

/// Errors raised while deriving metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// A derived value fell outside the decimal range.
    #[error("{0} overflowed the decimal range")]
    Overflow(MetricKey),
}
