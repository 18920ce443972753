//! Cash engine: per-year convergence and the multi-year driver.

use campusplan_shared::types::Year;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::error::CashEngineError;
use super::types::{
    CheckKind, ConvergenceCheck, ConvergenceCheckMode, ConvergenceStatus, EngineConfig,
    MultiYearResult, UNBOUNDED_DIFFERENCE, YearOutcome,
};
use crate::metrics::{InterestRates, MetricKey, MetricRecord, MetricsCalculator, MetricsError};

/// Reconciles P&L, balance sheet and cash flow for each year.
///
/// The engine holds only its configuration; all continuity between years is
/// passed in explicitly, so the same inputs always produce the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashEngine {
    config: EngineConfig,
    rates: InterestRates,
}

impl CashEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(config: EngineConfig, rates: InterestRates) -> Self {
        Self { config, rates }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the convergence loop for one year.
    ///
    /// Each iteration fills the interest legs (when both are unset), derives
    /// all metrics, evaluates the balance sheet and cash checks, and on
    /// failure moves balance sheet cash to the cash flow closing balance.
    /// When the iteration limit is reached the last record is returned with
    /// `converged = false`.
    ///
    /// # Errors
    ///
    /// Returns `Metrics` when a derived or adjusted value leaves the decimal
    /// range.
    pub fn converge_year(
        &self,
        year: Year,
        input: &MetricRecord,
        previous: Option<&MetricRecord>,
    ) -> Result<YearOutcome, CashEngineError> {
        let mode = self.config.convergence_check();
        let mut working = input.clone();
        let mut checks = Vec::new();
        let mut last_interest_inputs = None;
        let mut last_error = None;

        for iteration in 1..=self.config.max_iterations() {
            if !working.contains(MetricKey::InterestIncome)
                && !working.contains(MetricKey::InterestExpense)
            {
                let cash_beginning = working
                    .get(MetricKey::CashBeginning)
                    .or_else(|| previous.and_then(|p| p.get(MetricKey::CashEnding)));
                let inputs = (cash_beginning, working.get(MetricKey::CashEnding));
                // Same cash inputs give the same (empty) split.
                if last_interest_inputs != Some(inputs) {
                    let split = MetricsCalculator::interest_split(inputs.0, inputs.1, &self.rates)?;
                    working.set(MetricKey::InterestIncome, split.income);
                    working.set(MetricKey::InterestExpense, split.expense);
                    last_interest_inputs = Some(inputs);
                }
            }

            let derived = MetricsCalculator::derive(&working, previous)?;
            working.merge(&derived);

            let balance_sheet = self.balance_sheet_check(iteration, &working)?;
            let cash = self.cash_check(iteration, &working);
            let converged = match mode {
                ConvergenceCheckMode::BsCfBalance => balance_sheet.passed && cash.passed,
                ConvergenceCheckMode::CashBalance => cash.passed,
            };
            let error = match mode {
                ConvergenceCheckMode::BsCfBalance => balance_sheet.difference.max(cash.difference),
                ConvergenceCheckMode::CashBalance => cash.difference,
            };
            last_error = Some(error);

            debug!(
                year = year.value(),
                iteration,
                bs_difference = %balance_sheet.difference,
                cash_difference = %cash.difference,
                converged,
                "Cash engine iteration"
            );

            let balance_sheet_passed = balance_sheet.passed;
            checks.push(balance_sheet);
            checks.push(cash);

            if converged {
                return Ok(self.outcome(year, working, true, iteration, last_error, checks));
            }

            Self::adjust(&mut working, balance_sheet_passed)?;
        }

        warn!(
            year = year.value(),
            max_iterations = self.config.max_iterations(),
            last_error = ?last_error,
            "Cash engine did not converge"
        );
        Ok(self.outcome(
            year,
            working,
            false,
            self.config.max_iterations(),
            last_error,
            checks,
        ))
    }

    /// Runs `start..=end` strictly in calendar order.
    ///
    /// Each year receives the previous year's final record as carry-forward
    /// context. Years missing from `inputs` start from an empty record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidYearRange` when `start` is after `end`, and `Metrics`
    /// when any year overflows.
    pub fn run_years(
        &self,
        start: Year,
        end: Year,
        inputs: &BTreeMap<Year, MetricRecord>,
    ) -> Result<MultiYearResult, CashEngineError> {
        if start > end {
            return Err(CashEngineError::InvalidYearRange { start, end });
        }

        let empty = MetricRecord::new();
        let mut result = MultiYearResult::default();
        let mut previous: Option<MetricRecord> = None;

        for year in Year::range(start, end) {
            let input = inputs.get(&year).unwrap_or(&empty);
            let outcome = self.converge_year(year, input, previous.as_ref())?;
            previous = Some(outcome.metrics.clone());
            result.years.insert(year, outcome);
        }

        Ok(result)
    }

    fn balance_sheet_check(
        &self,
        iteration: u32,
        record: &MetricRecord,
    ) -> Result<ConvergenceCheck, MetricsError> {
        let net_assets = MetricsCalculator::equity(
            record.get(MetricKey::Assets),
            record.get(MetricKey::Liabilities),
        )?;
        Ok(self.check(iteration, CheckKind::BalanceSheet, net_assets, record.get(MetricKey::Equity)))
    }

    fn cash_check(&self, iteration: u32, record: &MetricRecord) -> ConvergenceCheck {
        self.check(
            iteration,
            CheckKind::Cash,
            record.get(MetricKey::Cash),
            record.get(MetricKey::CashEnding),
        )
    }

    fn check(
        &self,
        iteration: u32,
        name: CheckKind,
        value: Option<Decimal>,
        target: Option<Decimal>,
    ) -> ConvergenceCheck {
        // A gap too wide to represent is as far from passing as a missing side.
        let difference = match (value, target) {
            (Some(value), Some(target)) => value
                .checked_sub(target)
                .map_or(UNBOUNDED_DIFFERENCE, |gap| gap.abs()),
            _ => UNBOUNDED_DIFFERENCE,
        };
        ConvergenceCheck {
            iteration,
            name,
            passed: difference.is_zero() || difference < self.config.tolerance(),
            value,
            target,
            difference,
        }
    }

    /// Moves balance sheet cash onto the cash flow closing balance.
    fn adjust(record: &mut MetricRecord, balance_sheet_passed: bool) -> Result<(), MetricsError> {
        if let Some(cash_ending) = record.get(MetricKey::CashEnding) {
            let delta = cash_ending
                .checked_sub(record.get(MetricKey::Cash).unwrap_or_default())
                .ok_or(MetricsError::Overflow(MetricKey::Cash))?;
            record.insert(MetricKey::Cash, cash_ending);

            match (
                record.get(MetricKey::AssetsCurrent),
                record.get(MetricKey::AssetsFixed),
                record.get(MetricKey::Assets),
            ) {
                (Some(current), _, _) => {
                    let shifted = current
                        .checked_add(delta)
                        .ok_or(MetricsError::Overflow(MetricKey::AssetsCurrent))?;
                    record.insert(MetricKey::AssetsCurrent, shifted);
                }
                // Totals supplied without components: shift the total itself.
                (None, None, Some(assets)) => {
                    let shifted = assets
                        .checked_add(delta)
                        .ok_or(MetricsError::Overflow(MetricKey::Assets))?;
                    record.insert(MetricKey::Assets, shifted);
                }
                // No current assets known: treat them as all cash.
                (None, _, _) => record.insert(MetricKey::AssetsCurrent, cash_ending),
            }
        }

        if !balance_sheet_passed {
            let equity = MetricsCalculator::equity(
                record.get(MetricKey::Assets),
                record.get(MetricKey::Liabilities),
            )?;
            if let Some(equity) = equity {
                record.insert(MetricKey::Equity, equity);
            }
        }
        Ok(())
    }

    fn outcome(
        &self,
        year: Year,
        metrics: MetricRecord,
        converged: bool,
        iterations: u32,
        last_error: Option<Decimal>,
        checks: Vec<ConvergenceCheck>,
    ) -> YearOutcome {
        YearOutcome {
            year,
            metrics,
            convergence: ConvergenceStatus {
                converged,
                iterations,
                max_iterations: self.config.max_iterations(),
                tolerance: self.config.tolerance(),
                last_error,
                checks,
            },
        }
    }
}
