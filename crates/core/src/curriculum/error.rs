//! Curriculum error types.

use thiserror::Error;

use super::types::CurriculumType;

/// Curriculum-related errors.
#[derive(Debug, Error)]
pub enum CurriculumError {
    /// FR and IB results from different years cannot be combined.
    #[error("Curriculum year mismatch: FR is {fr_year}, IB is {ib_year}")]
    YearMismatch {
        /// Year of the FR result.
        fr_year: i32,
        /// Year of the IB result.
        ib_year: i32,
    },

    /// A result was passed in the wrong aggregation slot.
    #[error("Expected {expected} curriculum, got {found}")]
    WrongCurriculum {
        /// Curriculum expected in the slot.
        expected: CurriculumType,
        /// Curriculum actually passed.
        found: CurriculumType,
    },

    /// CPI frequency of zero.
    #[error("{0} CPI frequency must be at least 1 year")]
    InvalidCpiFrequency(CurriculumType),

    /// FR and IB totals left the numeric range when combined.
    #[error("Arithmetic overflow combining FR and IB figures for {year}")]
    AggregateOverflow {
        /// Year being combined.
        year: i32,
    },

    /// Arithmetic overflow while compounding.
    #[error("Arithmetic overflow computing {curriculum} figures for {year}")]
    Overflow {
        /// Curriculum being computed.
        curriculum: CurriculumType,
        /// Year being computed.
        year: i32,
    },
}
