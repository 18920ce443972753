//! Rent calculations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::RentError;
use super::types::{FixedEscalationConfig, PartnerModelConfig, RentModel, RevenueShareConfig};
use crate::compounding::{gated_periods, growth_factor};

/// Rent for one year of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentProjection {
    /// Calendar year.
    pub year: i32,
    /// Rent due for the year.
    pub rent: Decimal,
    /// Revenue used for revenue share and rent load, if known.
    pub revenue: Option<Decimal>,
    /// Rent as a percentage of revenue.
    pub rent_load_pct: Option<Decimal>,
}

/// Stateless rent calculator.
pub struct RentCalculator;

impl RentCalculator {
    /// `base_rent * (1 + rate)^floor((year - base_year) / frequency)`.
    pub fn fixed_escalation(config: &FixedEscalationConfig, year: i32) -> Result<Decimal, RentError> {
        let overflow = || RentError::Overflow {
            model: RentModel::FIXED_ESCALATION,
            year,
        };
        let periods = gated_periods(year, config.base_year, config.frequency).ok_or_else(|| {
            RentError::InvalidConfig {
                model: RentModel::FIXED_ESCALATION,
                errors: config.validate(),
            }
        })?;
        let factor = growth_factor(config.escalation_rate, periods).ok_or_else(overflow)?;
        config.base_rent.checked_mul(factor).ok_or_else(overflow)
    }

    /// `revenue * pct / 100`, raised to the minimum then lowered to the maximum.
    ///
    /// With a minimum above the maximum the maximum wins; such configs are
    /// rejected when a `RentModel` is constructed. `None` on overflow.
    #[must_use]
    pub fn revenue_share(config: &RevenueShareConfig, revenue: Decimal) -> Option<Decimal> {
        let mut rent = revenue.checked_mul(config.revenue_share_pct)? / Decimal::ONE_HUNDRED;
        if let Some(minimum) = config.minimum_rent {
            rent = rent.max(minimum);
        }
        if let Some(maximum) = config.maximum_rent {
            rent = rent.min(maximum);
        }
        Some(rent)
    }

    /// `capex_base * yield / 100`, with the yield growing every
    /// `growth_frequency` years.
    pub fn partner_model(config: &PartnerModelConfig, year: i32) -> Result<Decimal, RentError> {
        let overflow = || RentError::Overflow {
            model: RentModel::PARTNER_MODEL,
            year,
        };
        let periods = gated_periods(year, config.base_year, config.growth_frequency).ok_or_else(|| {
            RentError::InvalidConfig {
                model: RentModel::PARTNER_MODEL,
                errors: config.validate(),
            }
        })?;
        let factor = growth_factor(config.growth_rate, periods).ok_or_else(overflow)?;
        let yield_pct = config.yield_base.checked_mul(factor).ok_or_else(overflow)?;
        config
            .capex_base()
            .and_then(|capex| capex.checked_mul(yield_pct))
            .map(|amount| amount / Decimal::ONE_HUNDRED)
            .ok_or_else(overflow)
    }

    /// Rent for `year` under `model`. `revenue` is only read by revenue share.
    pub fn calculate(model: &RentModel, year: i32, revenue: Decimal) -> Result<Decimal, RentError> {
        match model {
            RentModel::FixedEscalation(config) => Self::fixed_escalation(config, year),
            RentModel::RevenueShare(config) => {
                Self::revenue_share(config, revenue).ok_or(RentError::Overflow {
                    model: RentModel::REVENUE_SHARE,
                    year,
                })
            }
            RentModel::PartnerModel(config) => Self::partner_model(config, year),
        }
    }

    /// Rent for every year in `start_year..=end_year`.
    ///
    /// Years missing from `revenues` are computed with zero revenue and
    /// have no rent load.
    pub fn project(
        model: &RentModel,
        start_year: i32,
        end_year: i32,
        revenues: &BTreeMap<i32, Decimal>,
    ) -> Result<Vec<RentProjection>, RentError> {
        (start_year..=end_year)
            .map(|year| {
                let revenue = revenues.get(&year).copied();
                let rent = Self::calculate(model, year, revenue.unwrap_or_default())?;
                Ok(RentProjection {
                    year,
                    rent,
                    revenue,
                    rent_load_pct: revenue.and_then(|revenue| Self::rent_load_pct(rent, revenue)),
                })
            })
            .collect()
    }

    /// Net present value of a rent series.
    ///
    /// The rent at index `i` is discounted by `(1 + rate)^(i + start_offset)`;
    /// an offset of 0 leaves the first rent undiscounted.
    pub fn npv(rents: &[Decimal], discount_rate: Decimal, start_offset: u32) -> Result<Decimal, RentError> {
        rents
            .iter()
            .zip(i64::from(start_offset)..)
            .enumerate()
            .try_fold(Decimal::ZERO, |total, (index, (rent, exponent))| {
                let factor = growth_factor(discount_rate, exponent)
                    .filter(|factor| !factor.is_zero())
                    .ok_or_else(|| RentError::InvalidDiscountRate(discount_rate.to_string()))?;
                rent.checked_div(factor)
                    .and_then(|discounted| total.checked_add(discounted))
                    .ok_or(RentError::NpvOverflow { index })
            })
    }

    /// Rent as a percentage of revenue; `None` for zero revenue or a ratio
    /// outside the decimal range.
    #[must_use]
    pub fn rent_load_pct(rent: Decimal, revenue: Decimal) -> Option<Decimal> {
        rent.checked_div(revenue)?.checked_mul(Decimal::ONE_HUNDRED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn fixed(frequency: u32) -> FixedEscalationConfig {
        FixedEscalationConfig {
            base_rent: dec!(100000),
            escalation_rate: dec!(0.03),
            frequency,
            base_year: 2025,
        }
    }

    #[rstest]
    #[case(2025, dec!(100000))]
    #[case(2026, dec!(103000))]
    #[case(2028, dec!(109272.7))]
    fn test_fixed_escalation_annual(#[case] year: i32, #[case] expected: Decimal) {
        assert_eq!(RentCalculator::fixed_escalation(&fixed(1), year).unwrap(), expected);
    }

    #[rstest]
    #[case(2026, dec!(100000))]
    #[case(2027, dec!(100000))]
    #[case(2028, dec!(103000))]
    #[case(2031, dec!(106090))]
    fn test_fixed_escalation_every_three_years(#[case] year: i32, #[case] expected: Decimal) {
        assert_eq!(RentCalculator::fixed_escalation(&fixed(3), year).unwrap(), expected);
    }

    #[test]
    fn test_fixed_escalation_zero_frequency_is_error() {
        let err = RentCalculator::fixed_escalation(&fixed(0), 2030).unwrap_err();
        assert!(matches!(err, RentError::InvalidConfig { .. }));
    }

    #[rstest]
    #[case(dec!(1000000), Some(dec!(150000)), None, dec!(150000))]
    #[case(dec!(2000000), Some(dec!(150000)), None, dec!(200000))]
    #[case(dec!(5000000), Some(dec!(150000)), Some(dec!(300000)), dec!(300000))]
    #[case(dec!(1000000), None, None, dec!(100000))]
    fn test_revenue_share_clamp(
        #[case] revenue: Decimal,
        #[case] minimum_rent: Option<Decimal>,
        #[case] maximum_rent: Option<Decimal>,
        #[case] expected: Decimal,
    ) {
        let config = RevenueShareConfig {
            revenue_share_pct: dec!(10),
            minimum_rent,
            maximum_rent,
        };
        assert_eq!(RentCalculator::revenue_share(&config, revenue), Some(expected));
    }

    #[test]
    fn test_revenue_share_minimum_applied_before_maximum() {
        let config = RevenueShareConfig {
            revenue_share_pct: dec!(10),
            minimum_rent: Some(dec!(500)),
            maximum_rent: Some(dec!(300)),
        };
        assert_eq!(RentCalculator::revenue_share(&config, dec!(1000)), Some(dec!(300)));
    }

    #[test]
    fn test_partner_model() {
        let config = PartnerModelConfig {
            land_size: dec!(10000),
            land_price_per_sqm: dec!(500),
            bua_size: dec!(8000),
            bua_price_per_sqm: dec!(2500),
            yield_base: dec!(8),
            growth_rate: dec!(0.10),
            growth_frequency: 2,
            base_year: 2025,
        };
        // capex 25,000,000 at 8% = 2,000,000
        assert_eq!(RentCalculator::partner_model(&config, 2025).unwrap(), dec!(2000000));
        assert_eq!(RentCalculator::partner_model(&config, 2026).unwrap(), dec!(2000000));
        // yield 8.8% from 2027
        assert_eq!(RentCalculator::partner_model(&config, 2027).unwrap(), dec!(2200000));
    }

    #[test]
    fn test_project_with_rent_load() {
        let model = RentModel::RevenueShare(RevenueShareConfig {
            revenue_share_pct: dec!(15),
            minimum_rent: None,
            maximum_rent: None,
        });
        let revenues = BTreeMap::from([(2025, dec!(1000)), (2026, dec!(2000))]);

        let projection = RentCalculator::project(&model, 2025, 2027, &revenues).unwrap();

        assert_eq!(projection.len(), 3);
        assert_eq!(projection[1].rent, dec!(300));
        assert_eq!(projection[1].rent_load_pct, Some(dec!(15)));
        assert_eq!(projection[2].revenue, None);
        assert_eq!(projection[2].rent_load_pct, None);
    }

    #[rstest]
    #[case(0, dec!(200))]
    #[case(1, dec!(181.8181818182))]
    fn test_npv_offset(#[case] offset: u32, #[case] expected: Decimal) {
        let rents = [dec!(100), dec!(110)];
        let npv = RentCalculator::npv(&rents, dec!(0.10), offset).unwrap();
        assert_eq!(npv.round_dp(10), expected);
    }

    #[test]
    fn test_npv_rejects_total_loss_rate() {
        let err = RentCalculator::npv(&[dec!(100), dec!(100)], dec!(-1), 0).unwrap_err();
        assert!(matches!(err, RentError::InvalidDiscountRate(_)));
    }

    #[test]
    fn test_rent_load_pct() {
        assert_eq!(RentCalculator::rent_load_pct(dec!(150), dec!(1000)), Some(dec!(15)));
        assert_eq!(RentCalculator::rent_load_pct(dec!(150), Decimal::ZERO), None);
        assert_eq!(RentCalculator::rent_load_pct(Decimal::MAX, dec!(0.5)), None);
    }

    #[test]
    fn test_revenue_share_overflow_is_error() {
        let model = RentModel::RevenueShare(RevenueShareConfig {
            revenue_share_pct: dec!(50),
            minimum_rent: None,
            maximum_rent: None,
        });
        let err = RentCalculator::calculate(&model, 2030, Decimal::MAX).unwrap_err();
        assert!(matches!(
            err,
            RentError::Overflow {
                model: "RevenueShare",
                year: 2030
            }
        ));
    }

    #[test]
    fn test_partner_capex_overflow_is_error() {
        let config = PartnerModelConfig {
            land_size: Decimal::MAX,
            land_price_per_sqm: dec!(2),
            bua_size: dec!(1),
            bua_price_per_sqm: dec!(1),
            yield_base: dec!(8),
            growth_rate: dec!(0.10),
            growth_frequency: 1,
            base_year: 2025,
        };
        assert_eq!(config.capex_base(), None);
        let err = RentCalculator::partner_model(&config, 2025).unwrap_err();
        assert!(matches!(err, RentError::Overflow { model: "PartnerModel", .. }));
    }

    #[test]
    fn test_npv_overflow_is_error() {
        let err = RentCalculator::npv(&[Decimal::MAX, Decimal::MAX], Decimal::ZERO, 0).unwrap_err();
        assert!(matches!(err, RentError::NpvOverflow { index: 1 }));
    }
}
