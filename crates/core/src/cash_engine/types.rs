//! Cash engine data types.

use campusplan_shared::types::Year;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::CashEngineError;
use crate::metrics::MetricRecord;

/// Difference reported when one side of a check is null.
pub const UNBOUNDED_DIFFERENCE: Decimal = Decimal::MAX;

/// Which balance checks must pass for a year to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceCheckMode {
    /// Balance sheet and cash checks.
    #[default]
    BsCfBalance,
    /// Cash check only.
    CashBalance,
}

impl ConvergenceCheckMode {
    /// Returns the configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BsCfBalance => "bs_cf_balance",
            Self::CashBalance => "cash_balance",
        }
    }
}

impl std::str::FromStr for ConvergenceCheckMode {
    type Err = CashEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bs_cf_balance" => Ok(Self::BsCfBalance),
            "cash_balance" => Ok(Self::CashBalance),
            other => Err(CashEngineError::UnknownConvergenceCheck(other.to_string())),
        }
    }
}

/// Iteration bounds and acceptance criteria for the convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    max_iterations: u32,
    tolerance: Decimal,
    convergence_check: ConvergenceCheckMode,
}

impl EngineConfig {
    /// Creates a validated config.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_iterations` is zero or `tolerance` is negative.
    pub fn new(
        max_iterations: u32,
        tolerance: Decimal,
        convergence_check: ConvergenceCheckMode,
    ) -> Result<Self, CashEngineError> {
        if max_iterations == 0 {
            return Err(CashEngineError::InvalidMaxIterations);
        }
        if tolerance.is_sign_negative() && !tolerance.is_zero() {
            return Err(CashEngineError::NegativeTolerance(tolerance));
        }
        Ok(Self {
            max_iterations,
            tolerance,
            convergence_check,
        })
    }

    /// Upper bound on iterations per year.
    #[must_use]
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Maximum accepted difference.
    #[must_use]
    pub const fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Convergence predicate.
    #[must_use]
    pub const fn convergence_check(&self) -> ConvergenceCheckMode {
        self.convergence_check
    }
}

impl Default for EngineConfig {
    /// 3 iterations, 0.01 tolerance, both checks.
    fn default() -> Self {
        Self {
            max_iterations: 3,
            tolerance: Decimal::new(1, 2),
            convergence_check: ConvergenceCheckMode::BsCfBalance,
        }
    }
}

/// Balance check evaluated on every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// `assets - liabilities` against `equity`.
    BalanceSheet,
    /// Balance sheet `cash` against cash flow `cash_ending`.
    Cash,
}

/// Result of one check on one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceCheck {
    /// Iteration number, starting at 1.
    pub iteration: u32,
    /// Which check.
    pub name: CheckKind,
    /// Whether the difference was within tolerance.
    pub passed: bool,
    /// Left-hand side (`assets - liabilities`, or `cash`).
    pub value: Option<Decimal>,
    /// Right-hand side (`equity`, or `cash_ending`).
    pub target: Option<Decimal>,
    /// Absolute difference; `UNBOUNDED_DIFFERENCE` when a side is null.
    pub difference: Decimal,
}

/// Convergence diagnostics for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceStatus {
    /// Whether the configured checks passed.
    pub converged: bool,
    /// Iterations performed.
    pub iterations: u32,
    /// Configured iteration limit.
    pub max_iterations: u32,
    /// Configured tolerance.
    pub tolerance: Decimal,
    /// Worst relevant difference on the last iteration.
    pub last_error: Option<Decimal>,
    /// Every check from every iteration, in evaluation order.
    pub checks: Vec<ConvergenceCheck>,
}

/// Engine output for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOutcome {
    /// Year.
    pub year: Year,
    /// Final record.
    pub metrics: MetricRecord,
    /// Convergence diagnostics.
    pub convergence: ConvergenceStatus,
}

/// Engine output for a run of consecutive years.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiYearResult {
    /// Outcomes keyed by year.
    pub years: BTreeMap<Year, YearOutcome>,
}

/// Roll-up of a multi-year run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Years computed.
    pub years: usize,
    /// Years that converged.
    pub converged_years: usize,
    /// Years that hit the iteration limit.
    pub unconverged: Vec<Year>,
    /// Largest `last_error` across all years.
    pub worst_error: Option<Decimal>,
}

impl MultiYearResult {
    /// Returns the outcome for `year`.
    #[must_use]
    pub fn get(&self, year: Year) -> Option<&YearOutcome> {
        self.years.get(&year)
    }

    /// Summarises convergence across the run.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let unconverged: Vec<Year> = self
            .years
            .values()
            .filter(|outcome| !outcome.convergence.converged)
            .map(|outcome| outcome.year)
            .collect();

        RunSummary {
            years: self.years.len(),
            converged_years: self.years.len() - unconverged.len(),
            unconverged,
            worst_error: self
                .years
                .values()
                .filter_map(|outcome| outcome.convergence.last_error)
                .max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn test_engine_config_bounds() {
        assert!(matches!(
            EngineConfig::new(0, dec!(0.01), ConvergenceCheckMode::BsCfBalance),
            Err(CashEngineError::InvalidMaxIterations)
        ));
        assert!(matches!(
            EngineConfig::new(3, dec!(-0.5), ConvergenceCheckMode::BsCfBalance),
            Err(CashEngineError::NegativeTolerance(_))
        ));
        assert!(EngineConfig::new(1, Decimal::ZERO, ConvergenceCheckMode::CashBalance).is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations(), 3);
        assert_eq!(config.tolerance(), dec!(0.01));
        assert_eq!(config.convergence_check(), ConvergenceCheckMode::BsCfBalance);
    }

    #[test]
    fn test_convergence_check_mode_parse() {
        assert_eq!(
            ConvergenceCheckMode::from_str("cash_balance").unwrap(),
            ConvergenceCheckMode::CashBalance
        );
        assert_eq!(
            ConvergenceCheckMode::from_str(ConvergenceCheckMode::BsCfBalance.as_str()).unwrap(),
            ConvergenceCheckMode::BsCfBalance
        );
        assert!(ConvergenceCheckMode::from_str("strict").is_err());
    }
}
