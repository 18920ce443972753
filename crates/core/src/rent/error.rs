//! Rent error types.

use thiserror::Error;

/// Rent-related errors.
#[derive(Debug, Error)]
pub enum RentError {
    /// The model tag is not one of the supported rent models.
    #[error("Unknown rent model: {0}")]
    UnknownModel(String),

    /// The config payload does not have the shape required by its tag.
    #[error("Invalid {model} config: {reason}")]
    ConfigShape {
        /// Model tag.
        model: &'static str,
        /// Deserialisation failure.
        reason: String,
    },

    /// The config has the right shape but fails structural validation.
    #[error("Invalid {model} config: {}", .errors.join("; "))]
    InvalidConfig {
        /// Model tag.
        model: &'static str,
        /// Human-readable validation errors.
        errors: Vec<String>,
    },

    /// Arithmetic overflow while compounding.
    #[error("Arithmetic overflow computing {model} rent for {year}")]
    Overflow {
        /// Model tag.
        model: &'static str,
        /// Year being computed.
        year: i32,
    },

    /// A discounted rent or the running NPV left the decimal range.
    #[error("Arithmetic overflow discounting rent at index {index}")]
    NpvOverflow {
        /// Position of the rent in the series.
        index: usize,
    },

    /// Discount factor could not be computed.
    #[error("Invalid discount rate for NPV: {0}")]
    InvalidDiscountRate(String),
}
