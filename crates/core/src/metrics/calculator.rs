//! Derived metric calculations.
//!
//! All functions are pure and null-propagating: a derived value is `None`
//! whenever a required operand is `None`, unless a fallback is listed on the
//! function. Arithmetic is checked; a result outside the decimal range is a
//! `MetricsError::Overflow` naming the metric.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::MetricsError;
use super::keys::MetricKey;
use super::record::MetricRecord;

/// Operational provision rate (2% of operating expenses).
const PROVISION_OPERATIONAL_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

/// Contingency provision rate (5% of net income, or revenue).
const PROVISION_CONTINGENCY_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

const TWO: Decimal = Decimal::TWO;

/// A derived value: `Ok(None)` when an operand is unknown.
pub type Derived = Result<Option<Decimal>, MetricsError>;

/// Interest rates applied to the average cash balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRates {
    /// Rate earned when the average balance is positive.
    pub deposit_rate: Decimal,
    /// Rate charged when the average balance is negative.
    pub overdraft_rate: Decimal,
}

impl Default for InterestRates {
    fn default() -> Self {
        Self {
            deposit_rate: Decimal::new(2, 2),
            overdraft_rate: Decimal::new(5, 2),
        }
    }
}

/// Interest legs derived from the average cash balance.
///
/// At most one leg is known: income for a positive balance, expense for a
/// negative one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterestSplit {
    /// Interest earned.
    pub income: Option<Decimal>,
    /// Interest charged.
    pub expense: Option<Decimal>,
}

/// Applies a checked binary operation when both operands are known.
fn combine(
    metric: MetricKey,
    a: Option<Decimal>,
    b: Option<Decimal>,
    op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> Derived {
    match (a, b) {
        (Some(a), Some(b)) => op(a, b).map(Some).ok_or(MetricsError::Overflow(metric)),
        _ => Ok(None),
    }
}

/// Stateless calculator for derived metrics.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// `revenue - cost_of_sales`.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the difference leaves the decimal range.
    pub fn gross_profit(revenue: Option<Decimal>, cost_of_sales: Option<Decimal>) -> Derived {
        combine(MetricKey::GrossProfit, revenue, cost_of_sales, Decimal::checked_sub)
    }

    /// `gross_profit - operating_expenses`.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the difference leaves the decimal range.
    pub fn ebitda(gross_profit: Option<Decimal>, operating_expenses: Option<Decimal>) -> Derived {
        combine(MetricKey::Ebitda, gross_profit, operating_expenses, Decimal::checked_sub)
    }

    /// `ebitda - depreciation`, or `ebitda` itself when depreciation is null.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the difference leaves the decimal range.
    pub fn ebit(ebitda: Option<Decimal>, depreciation: Option<Decimal>) -> Derived {
        if depreciation.is_none() {
            return Ok(ebitda);
        }
        combine(MetricKey::Ebit, ebitda, depreciation, Decimal::checked_sub)
    }

    /// `ebit + interest_income - interest_expense`.
    ///
    /// Missing interest legs count as zero; a missing `ebit` makes the result
    /// null.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the result leaves the decimal range.
    pub fn net_income(
        ebit: Option<Decimal>,
        interest_income: Option<Decimal>,
        interest_expense: Option<Decimal>,
    ) -> Derived {
        let Some(ebit) = ebit else {
            return Ok(None);
        };
        ebit.checked_add(interest_income.unwrap_or_default())
            .and_then(|value| value.checked_sub(interest_expense.unwrap_or_default()))
            .map(Some)
            .ok_or(MetricsError::Overflow(MetricKey::NetIncome))
    }

    /// Splits interest on the average of opening and closing cash.
    ///
    /// A zero or unknown average produces no interest on either leg.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the average or either leg leaves the decimal
    /// range.
    pub fn interest_split(
        cash_beginning: Option<Decimal>,
        cash_ending: Option<Decimal>,
        rates: &InterestRates,
    ) -> Result<InterestSplit, MetricsError> {
        let (Some(beginning), Some(ending)) = (cash_beginning, cash_ending) else {
            return Ok(InterestSplit::default());
        };
        let Some(total) = beginning.checked_add(ending) else {
            // Only same-signed balances overflow; the sign picks the leg.
            let leg = if beginning.is_sign_negative() {
                MetricKey::InterestExpense
            } else {
                MetricKey::InterestIncome
            };
            return Err(MetricsError::Overflow(leg));
        };
        let average = total / TWO;

        if average > Decimal::ZERO {
            let income = average
                .checked_mul(rates.deposit_rate)
                .ok_or(MetricsError::Overflow(MetricKey::InterestIncome))?;
            Ok(InterestSplit {
                income: Some(income),
                expense: None,
            })
        } else if average < Decimal::ZERO {
            let expense = average
                .abs()
                .checked_mul(rates.overdraft_rate)
                .ok_or(MetricsError::Overflow(MetricKey::InterestExpense))?;
            Ok(InterestSplit {
                income: None,
                expense: Some(expense),
            })
        } else {
            Ok(InterestSplit::default())
        }
    }

    /// 2% of operating expenses.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the product leaves the decimal range.
    pub fn provision_operational(operating_expenses: Option<Decimal>) -> Derived {
        combine(
            MetricKey::ProvisionOperational,
            operating_expenses,
            Some(PROVISION_OPERATIONAL_RATE),
            Decimal::checked_mul,
        )
    }

    /// 5% of net income, falling back to revenue.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the product leaves the decimal range.
    pub fn provision_contingency(net_income: Option<Decimal>, revenue: Option<Decimal>) -> Derived {
        combine(
            MetricKey::ProvisionContingency,
            net_income.or(revenue),
            Some(PROVISION_CONTINGENCY_RATE),
            Decimal::checked_mul,
        )
    }

    /// Sums two components of `metric`, falling back to whichever one is
    /// present.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the sum leaves the decimal range.
    pub fn sum_or_either(metric: MetricKey, a: Option<Decimal>, b: Option<Decimal>) -> Derived {
        match (a, b) {
            (Some(_), Some(_)) => combine(metric, a, b, Decimal::checked_add),
            (Some(value), None) | (None, Some(value)) => Ok(Some(value)),
            (None, None) => Ok(None),
        }
    }

    /// `assets - liabilities` when both are known.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the difference leaves the decimal range.
    pub fn equity(assets: Option<Decimal>, liabilities: Option<Decimal>) -> Derived {
        combine(MetricKey::Equity, assets, liabilities, Decimal::checked_sub)
    }

    /// Sum of the cash flow legs.
    ///
    /// Null only when every leg is null; otherwise missing legs count as zero.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the sum leaves the decimal range.
    pub fn cf_net_change(
        operating: Option<Decimal>,
        investing: Option<Decimal>,
        financing: Option<Decimal>,
    ) -> Derived {
        [operating, investing, financing]
            .into_iter()
            .try_fold(None, |total: Option<Decimal>, leg| {
                Self::sum_or_either(MetricKey::CfNetChange, total, leg)
            })
    }

    /// `cash_beginning + cf_net_change` when both are known.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` when the sum leaves the decimal range.
    pub fn cash_ending(cash_beginning: Option<Decimal>, cf_net_change: Option<Decimal>) -> Derived {
        combine(MetricKey::CashEnding, cash_beginning, cf_net_change, Decimal::checked_add)
    }

    /// Derives every computable metric from `record`.
    ///
    /// `previous` is the prior year's converged record: it supplies opening
    /// cash when the record has none and the retained earnings carried
    /// forward. Only keys that could be computed are present in the result,
    /// so merging it never erases known inputs. Interest legs are read from
    /// `record`, not computed here.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` naming the first metric whose value leaves the
    /// decimal range.
    pub fn derive(
        record: &MetricRecord,
        previous: Option<&MetricRecord>,
    ) -> Result<MetricRecord, MetricsError> {
        let get = |key| record.get(key);
        let previous_value = |key| previous.and_then(|p| p.get(key));

        let revenue = get(MetricKey::Revenue);
        let operating_expenses = get(MetricKey::OperatingExpenses);

        let gross_profit = Self::gross_profit(revenue, get(MetricKey::CostOfSales))?;
        let ebitda = Self::ebitda(gross_profit, operating_expenses)?;
        let ebit = Self::ebit(ebitda, get(MetricKey::Depreciation))?;
        let net_income = Self::net_income(
            ebit,
            get(MetricKey::InterestIncome),
            get(MetricKey::InterestExpense),
        )?;

        let assets = Self::sum_or_either(
            MetricKey::Assets,
            get(MetricKey::AssetsCurrent),
            get(MetricKey::AssetsFixed),
        )?;
        let liabilities = Self::sum_or_either(
            MetricKey::Liabilities,
            get(MetricKey::LiabilitiesCurrent),
            get(MetricKey::Debt),
        )?;
        let equity = Self::equity(assets, liabilities)?;
        let retained_earnings = Self::sum_or_either(
            MetricKey::RetainedEarnings,
            previous_value(MetricKey::RetainedEarnings),
            net_income,
        )?;

        let cash_beginning = get(MetricKey::CashBeginning).or_else(|| previous_value(MetricKey::CashEnding));
        let cf_net_change = Self::cf_net_change(
            get(MetricKey::CfOperating),
            get(MetricKey::CfInvesting),
            get(MetricKey::CfFinancing),
        )?;
        let cash_ending = Self::cash_ending(cash_beginning, cf_net_change)?;

        Ok([
            (MetricKey::GrossProfit, gross_profit),
            (MetricKey::Ebitda, ebitda),
            (MetricKey::Ebit, ebit),
            (MetricKey::NetIncome, net_income),
            (MetricKey::ProvisionOperational, Self::provision_operational(operating_expenses)?),
            (MetricKey::ProvisionContingency, Self::provision_contingency(net_income, revenue)?),
            (MetricKey::Assets, assets),
            (MetricKey::Liabilities, liabilities),
            (MetricKey::Equity, equity),
            (MetricKey::RetainedEarnings, retained_earnings),
            (MetricKey::CashBeginning, cash_beginning),
            (MetricKey::CfNetChange, cf_net_change),
            (MetricKey::CashEnding, cash_ending),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(values: &[(MetricKey, Decimal)]) -> MetricRecord {
        values.iter().copied().collect()
    }

    #[test]
    fn test_gross_profit_null_propagation() {
        assert_eq!(MetricsCalculator::gross_profit(None, Some(dec!(10))), Ok(None));
        assert_eq!(MetricsCalculator::gross_profit(Some(dec!(10)), None), Ok(None));
        assert_eq!(
            MetricsCalculator::gross_profit(Some(dec!(100)), Some(dec!(40))),
            Ok(Some(dec!(60)))
        );
    }

    #[test]
    fn test_ebit_falls_back_to_ebitda() {
        assert_eq!(MetricsCalculator::ebit(Some(dec!(50)), None), Ok(Some(dec!(50))));
        assert_eq!(MetricsCalculator::ebit(Some(dec!(50)), Some(dec!(8))), Ok(Some(dec!(42))));
        assert_eq!(MetricsCalculator::ebit(None, Some(dec!(8))), Ok(None));
    }

    #[test]
    fn test_net_income_treats_missing_interest_as_zero() {
        assert_eq!(MetricsCalculator::net_income(Some(dec!(100)), None, None), Ok(Some(dec!(100))));
        assert_eq!(
            MetricsCalculator::net_income(Some(dec!(100)), Some(dec!(5)), Some(dec!(2))),
            Ok(Some(dec!(103)))
        );
        assert_eq!(MetricsCalculator::net_income(None, Some(dec!(5)), None), Ok(None));
    }

    #[test]
    fn test_interest_split_positive_average() {
        let rates = InterestRates {
            deposit_rate: dec!(0.02),
            overdraft_rate: dec!(0.10),
        };
        let split =
            MetricsCalculator::interest_split(Some(dec!(1000)), Some(dec!(3000)), &rates).unwrap();
        assert_eq!(split.income, Some(dec!(40)));
        assert_eq!(split.expense, None);
    }

    #[test]
    fn test_interest_split_negative_average() {
        let rates = InterestRates {
            deposit_rate: dec!(0.02),
            overdraft_rate: dec!(0.10),
        };
        let split =
            MetricsCalculator::interest_split(Some(dec!(-1000)), Some(dec!(-3000)), &rates).unwrap();
        assert_eq!(split.income, None);
        assert_eq!(split.expense, Some(dec!(200)));
    }

    #[test]
    fn test_interest_split_zero_or_unknown_average_is_null() {
        let rates = InterestRates::default();
        assert_eq!(
            MetricsCalculator::interest_split(Some(dec!(-500)), Some(dec!(500)), &rates),
            Ok(InterestSplit::default())
        );
        assert_eq!(
            MetricsCalculator::interest_split(Some(dec!(500)), None, &rates),
            Ok(InterestSplit::default())
        );
    }

    #[test]
    fn test_interest_split_overflowing_balances() {
        let rates = InterestRates::default();
        assert_eq!(
            MetricsCalculator::interest_split(Some(Decimal::MAX), Some(Decimal::MAX), &rates),
            Err(MetricsError::Overflow(MetricKey::InterestIncome))
        );
        assert_eq!(
            MetricsCalculator::interest_split(Some(Decimal::MIN), Some(dec!(-1)), &rates),
            Err(MetricsError::Overflow(MetricKey::InterestExpense))
        );
    }

    #[test]
    fn test_provisions() {
        assert_eq!(MetricsCalculator::provision_operational(Some(dec!(1000))), Ok(Some(dec!(20))));
        assert_eq!(
            MetricsCalculator::provision_contingency(Some(dec!(200)), Some(dec!(1000))),
            Ok(Some(dec!(10)))
        );
        assert_eq!(
            MetricsCalculator::provision_contingency(None, Some(dec!(1000))),
            Ok(Some(dec!(50)))
        );
        assert_eq!(MetricsCalculator::provision_contingency(None, None), Ok(None));
    }

    #[test]
    fn test_cf_net_change_null_only_when_all_legs_null() {
        assert_eq!(MetricsCalculator::cf_net_change(None, None, None), Ok(None));
        assert_eq!(
            MetricsCalculator::cf_net_change(Some(dec!(100)), None, Some(dec!(-30))),
            Ok(Some(dec!(70)))
        );
        assert_eq!(
            MetricsCalculator::cf_net_change(None, Some(dec!(-30)), None),
            Ok(Some(dec!(-30)))
        );
    }

    #[test]
    fn test_cf_net_change_overflow() {
        assert_eq!(
            MetricsCalculator::cf_net_change(Some(Decimal::MAX), Some(dec!(1)), None),
            Err(MetricsError::Overflow(MetricKey::CfNetChange))
        );
    }

    #[test]
    fn test_overflow_names_the_metric() {
        assert_eq!(
            MetricsCalculator::gross_profit(Some(Decimal::MAX), Some(dec!(-1))),
            Err(MetricsError::Overflow(MetricKey::GrossProfit))
        );
        assert_eq!(
            MetricsCalculator::net_income(Some(Decimal::MAX), Some(dec!(1)), None),
            Err(MetricsError::Overflow(MetricKey::NetIncome))
        );
        assert_eq!(
            MetricsCalculator::equity(Some(Decimal::MIN), Some(dec!(1))),
            Err(MetricsError::Overflow(MetricKey::Equity))
        );
        assert_eq!(
            MetricsCalculator::provision_operational(Some(Decimal::MAX)),
            Ok(Some(Decimal::MAX * dec!(0.02)))
        );
        assert_eq!(
            MetricsError::Overflow(MetricKey::GrossProfit).to_string(),
            "gross_profit overflowed the decimal range"
        );
    }

    #[test]
    fn test_derive_full_record() {
        let input = record(&[
            (MetricKey::Revenue, dec!(1000)),
            (MetricKey::CostOfSales, dec!(300)),
            (MetricKey::OperatingExpenses, dec!(400)),
            (MetricKey::Depreciation, dec!(50)),
            (MetricKey::InterestIncome, dec!(10)),
            (MetricKey::AssetsCurrent, dec!(500)),
            (MetricKey::AssetsFixed, dec!(1500)),
            (MetricKey::LiabilitiesCurrent, dec!(200)),
            (MetricKey::Debt, dec!(800)),
            (MetricKey::CashBeginning, dec!(100)),
            (MetricKey::CfOperating, dec!(250)),
            (MetricKey::CfInvesting, dec!(-100)),
        ]);

        let derived = MetricsCalculator::derive(&input, None).unwrap();

        assert_eq!(derived.get(MetricKey::GrossProfit), Some(dec!(700)));
        assert_eq!(derived.get(MetricKey::Ebitda), Some(dec!(300)));
        assert_eq!(derived.get(MetricKey::Ebit), Some(dec!(250)));
        assert_eq!(derived.get(MetricKey::NetIncome), Some(dec!(260)));
        assert_eq!(derived.get(MetricKey::ProvisionOperational), Some(dec!(8)));
        assert_eq!(derived.get(MetricKey::ProvisionContingency), Some(dec!(13)));
        assert_eq!(derived.get(MetricKey::Assets), Some(dec!(2000)));
        assert_eq!(derived.get(MetricKey::Liabilities), Some(dec!(1000)));
        assert_eq!(derived.get(MetricKey::Equity), Some(dec!(1000)));
        assert_eq!(derived.get(MetricKey::RetainedEarnings), Some(dec!(260)));
        assert_eq!(derived.get(MetricKey::CfNetChange), Some(dec!(150)));
        assert_eq!(derived.get(MetricKey::CashEnding), Some(dec!(250)));
    }

    #[test]
    fn test_derive_revenue_null_leaves_gross_profit_null() {
        let input = record(&[(MetricKey::CostOfSales, dec!(300))]);
        let derived = MetricsCalculator::derive(&input, None).unwrap();
        assert_eq!(derived.get(MetricKey::GrossProfit), None);
        assert_eq!(derived.get(MetricKey::NetIncome), None);
    }

    #[test]
    fn test_derive_reports_overflow_instead_of_panicking() {
        let input = record(&[
            (MetricKey::Revenue, Decimal::MAX),
            (MetricKey::CostOfSales, dec!(-1)),
        ]);
        assert_eq!(
            MetricsCalculator::derive(&input, None),
            Err(MetricsError::Overflow(MetricKey::GrossProfit))
        );
    }

    #[test]
    fn test_derive_carries_previous_year_forward() {
        let previous = record(&[
            (MetricKey::CashEnding, dec!(900)),
            (MetricKey::RetainedEarnings, dec!(5000)),
        ]);
        let input = record(&[
            (MetricKey::Revenue, dec!(100)),
            (MetricKey::CostOfSales, dec!(0)),
            (MetricKey::OperatingExpenses, dec!(40)),
            (MetricKey::CfOperating, dec!(60)),
        ]);

        let derived = MetricsCalculator::derive(&input, Some(&previous)).unwrap();

        assert_eq!(derived.get(MetricKey::CashBeginning), Some(dec!(900)));
        assert_eq!(derived.get(MetricKey::CashEnding), Some(dec!(960)));
        assert_eq!(derived.get(MetricKey::RetainedEarnings), Some(dec!(5060)));
    }

    #[test]
    fn test_derive_explicit_cash_beginning_wins_over_carry_forward() {
        let previous = record(&[(MetricKey::CashEnding, dec!(900))]);
        let input = record(&[(MetricKey::CashBeginning, dec!(10))]);
        let derived = MetricsCalculator::derive(&input, Some(&previous)).unwrap();
        assert_eq!(derived.get(MetricKey::CashBeginning), Some(dec!(10)));
        assert_eq!(derived.get(MetricKey::CashEnding), None);
    }

    #[test]
    fn test_derive_single_component_fallbacks() {
        let input = record(&[
            (MetricKey::AssetsFixed, dec!(700)),
            (MetricKey::Debt, dec!(300)),
        ]);
        let derived = MetricsCalculator::derive(&input, None).unwrap();
        assert_eq!(derived.get(MetricKey::Assets), Some(dec!(700)));
        assert_eq!(derived.get(MetricKey::Liabilities), Some(dec!(300)));
        assert_eq!(derived.get(MetricKey::Equity), Some(dec!(400)));
    }
}
