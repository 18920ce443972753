//! Cash engine error types.

use campusplan_shared::types::{Year, YearOutOfRange};
use thiserror::Error;

use crate::metrics::MetricsError;

/// Cash engine errors.
///
/// Failing to converge is not an error; it is reported in the
/// `ConvergenceStatus` of the affected year.
#[derive(Debug, Error)]
pub enum CashEngineError {
    /// `max_iterations` must be at least 1.
    #[error("Max iterations must be at least 1")]
    InvalidMaxIterations,

    /// Tolerance must not be negative.
    #[error("Tolerance must not be negative, got {0}")]
    NegativeTolerance(rust_decimal::Decimal),

    /// Unrecognised convergence check name.
    #[error("Unknown convergence check: {0}")]
    UnknownConvergenceCheck(String),

    /// Start year after end year.
    #[error("Invalid year range: start {start} is after end {end}")]
    InvalidYearRange {
        /// First year requested.
        start: Year,
        /// Last year requested.
        end: Year,
    },

    /// Year outside the planning horizon.
    #[error(transparent)]
    YearOutOfRange(#[from] YearOutOfRange),

    /// A derived or adjusted metric left the decimal range.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
