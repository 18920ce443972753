//! Integer-period compounding on `Decimal`.
//!
//! Every growth formula in the plan raises `(1 + rate)` to a whole number of
//! periods, so no fractional powers (and no floats) are needed.

use rust_decimal::Decimal;

/// Number of completed adjustment periods between `base_year` and `year`.
///
/// Uses floor division, so years before the base year yield negative periods.
/// Returns `None` when `frequency` is zero.
#[must_use]
pub fn gated_periods(year: i32, base_year: i32, frequency: u32) -> Option<i64> {
    if frequency == 0 {
        return None;
    }
    Some((i64::from(year) - i64::from(base_year)).div_euclid(i64::from(frequency)))
}

/// Computes `(1 + rate)^periods`.
///
/// Negative periods discount instead of compounding. Returns `None` on
/// overflow or when a negative power of zero is requested.
#[must_use]
pub fn growth_factor(rate: Decimal, periods: i64) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(rate)?;
    let factor = power(base, periods.unsigned_abs())?;
    if periods >= 0 {
        Some(factor)
    } else {
        Decimal::ONE.checked_div(factor)
    }
}

fn power(base: Decimal, exponent: u64) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    let mut remaining = exponent;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result.checked_mul(square)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = square.checked_mul(square)?;
        }
    }
    Some(result)
}
