//! Projection years.
//!
//! The plan covers 2023 through 2052. The first two years are actuals and the
//! rest are forecast.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// First year covered by the plan.
pub const FIRST_YEAR: i32 = 2023;

/// Last year covered by the plan.
pub const LAST_YEAR: i32 = 2052;

/// First forecast (non-historical) year.
pub const FIRST_FORECAST_YEAR: i32 = 2025;

/// A year outside the supported planning horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("year {0} is outside the planning horizon {FIRST_YEAR}-{LAST_YEAR}")]
pub struct YearOutOfRange(pub i32);

/// A validated planning year in `[2023, 2052]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Year(i32);

impl Year {
    /// Creates a year, rejecting values outside the planning horizon.
    ///
    /// # Errors
    ///
    /// Returns `YearOutOfRange` if `value` is not in `[2023, 2052]`.
    pub const fn new(value: i32) -> Result<Self, YearOutOfRange> {
        if value < FIRST_YEAR || value > LAST_YEAR {
            return Err(YearOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the calendar year.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Returns true for years holding actuals rather than forecasts.
    #[must_use]
    pub const fn is_historical(self) -> bool {
        self.0 < FIRST_FORECAST_YEAR
    }

    /// Returns the following year, or `None` at the end of the horizon.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match Self::new(self.0 + 1) {
            Ok(year) => Some(year),
            Err(_) => None,
        }
    }

    /// Iterates `start..=end` in calendar order.
    pub fn range(start: Self, end: Self) -> impl Iterator<Item = Self> {
        (start.0..=end.0).map(Self)
    }
}

impl TryFrom<i32> for Year {
    type Error = YearOutOfRange;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Year> for i32 {
    fn from(year: Year) -> Self {
        year.0
    }
}

impl std::fmt::Display for Year {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2022, false)]
    #[case(2023, true)]
    #[case(2052, true)]
    #[case(2053, false)]
    fn test_horizon_bounds(#[case] value: i32, #[case] valid: bool) {
        assert_eq!(Year::new(value).is_ok(), valid);
    }

    #[rstest]
    #[case(2023, true)]
    #[case(2024, true)]
    #[case(2025, false)]
    #[case(2040, false)]
    fn test_historical_years(#[case] value: i32, #[case] historical: bool) {
        assert_eq!(Year::new(value).unwrap().is_historical(), historical);
    }

    #[test]
    fn test_next_stops_at_horizon() {
        assert_eq!(Year::new(2051).unwrap().next(), Year::new(2052).ok());
        assert_eq!(Year::new(2052).unwrap().next(), None);
    }

    #[test]
    fn test_range_is_ordered_and_inclusive() {
        let years: Vec<i32> = Year::range(Year::new(2025).unwrap(), Year::new(2028).unwrap())
            .map(Year::value)
            .collect();
        assert_eq!(years, vec![2025, 2026, 2027, 2028]);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Year>("2030").is_ok());
        assert!(serde_json::from_str::<Year>("1999").is_err());
    }
}
