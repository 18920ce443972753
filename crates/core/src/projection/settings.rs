//! Per-run engine settings resolved from admin configuration.

use campusplan_shared::config::EngineSettings;
use campusplan_shared::types::Year;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

use super::error::ProjectionError;
use super::extract::decimal_value;
use crate::cash_engine::{CashEngineError, ConvergenceCheckMode, EngineConfig};
use crate::metrics::InterestRates;

/// Admin key for the iteration limit.
pub const MAX_ITERATIONS_KEY: &str = "cash_engine_max_iterations";
/// Admin key for the balance check tolerance.
pub const TOLERANCE_KEY: &str = "cash_engine_tolerance";
/// Admin key for the convergence predicate.
pub const CONVERGENCE_CHECK_KEY: &str = "cash_engine_convergence_check";
/// Admin key for the deposit rate.
pub const DEPOSIT_RATE_KEY: &str = "interest_rate_deposit";
/// Admin key for the overdraft rate.
pub const OVERDRAFT_RATE_KEY: &str = "interest_rate_overdraft";

/// Highest iteration limit an admin may set. Each iteration records two
/// checks per year, so the limit also bounds the check history.
pub const MAX_ITERATIONS_CAP: u32 = 1_000;

/// Everything the engine needs for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Iteration bounds and acceptance criteria.
    pub engine: EngineConfig,
    /// Interest rates on average cash.
    pub rates: InterestRates,
    /// First projected year.
    pub start_year: Year,
    /// Last projected year (inclusive).
    pub end_year: Year,
}

impl RunSettings {
    /// Resolves settings from admin values, falling back to `defaults` for
    /// absent or null keys.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value cannot be parsed, if the admin
    /// iteration limit exceeds [`MAX_ITERATIONS_CAP`], or if the resulting
    /// engine config or year range is invalid.
    pub fn resolve(
        admin: &HashMap<String, Value>,
        defaults: &EngineSettings,
    ) -> Result<Self, ProjectionError> {
        let max_iterations = match integer_setting(admin, MAX_ITERATIONS_KEY)? {
            Some(limit) if limit > MAX_ITERATIONS_CAP => {
                return Err(ProjectionError::invalid_setting(
                    MAX_ITERATIONS_KEY,
                    format!("{limit} exceeds the cap of {MAX_ITERATIONS_CAP}"),
                ));
            }
            Some(limit) => limit,
            None => defaults.max_iterations,
        };
        let tolerance = decimal_setting(admin, TOLERANCE_KEY)?.unwrap_or(defaults.tolerance);
        let convergence_check = match text_setting(admin, CONVERGENCE_CHECK_KEY)? {
            Some(name) => name.parse::<ConvergenceCheckMode>()?,
            None => defaults.convergence_check.parse::<ConvergenceCheckMode>()?,
        };
        let rates = InterestRates {
            deposit_rate: decimal_setting(admin, DEPOSIT_RATE_KEY)?
                .unwrap_or(defaults.deposit_rate),
            overdraft_rate: decimal_setting(admin, OVERDRAFT_RATE_KEY)?
                .unwrap_or(defaults.overdraft_rate),
        };

        let engine = EngineConfig::new(max_iterations, tolerance, convergence_check)?;
        let start_year = Year::new(defaults.start_year).map_err(CashEngineError::from)?;
        let end_year = Year::new(defaults.end_year).map_err(CashEngineError::from)?;

        Ok(Self {
            engine,
            rates,
            start_year,
            end_year,
        })
    }
}

fn present<'a>(admin: &'a HashMap<String, Value>, key: &str) -> Option<&'a Value> {
    admin.get(key).filter(|value| !value.is_null())
}

fn integer_setting(
    admin: &HashMap<String, Value>,
    key: &str,
) -> Result<Option<u32>, ProjectionError> {
    let Some(value) = present(admin, key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        ProjectionError::invalid_setting(key, format!("expected a whole number, got {value}"))
    })
}

fn decimal_setting(
    admin: &HashMap<String, Value>,
    key: &str,
) -> Result<Option<Decimal>, ProjectionError> {
    let Some(value) = present(admin, key) else {
        return Ok(None);
    };
    decimal_value(value).map(Some).ok_or_else(|| {
        ProjectionError::invalid_setting(key, format!("expected a number, got {value}"))
    })
}

fn text_setting<'a>(
    admin: &'a HashMap<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, ProjectionError> {
    let Some(value) = present(admin, key) else {
        return Ok(None);
    };
    value.as_str().map(Some).ok_or_else(|| {
        ProjectionError::invalid_setting(key, format!("expected a string, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn admin(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_defaults_without_admin_values() {
        let run = RunSettings::resolve(&HashMap::new(), &EngineSettings::default()).unwrap();
        assert_eq!(run.engine, EngineConfig::default());
        assert_eq!(run.rates, InterestRates::default());
        assert_eq!(run.start_year.value(), 2025);
        assert_eq!(run.end_year.value(), 2052);
    }

    #[test]
    fn test_admin_values_override_defaults() {
        let values = admin(&[
            (MAX_ITERATIONS_KEY, json!("5")),
            (TOLERANCE_KEY, json!(0.5)),
            (CONVERGENCE_CHECK_KEY, json!("cash_balance")),
            (DEPOSIT_RATE_KEY, json!("0.03")),
            (OVERDRAFT_RATE_KEY, Value::Null),
        ]);
        let run = RunSettings::resolve(&values, &EngineSettings::default()).unwrap();
        assert_eq!(run.engine.max_iterations(), 5);
        assert_eq!(run.engine.tolerance(), dec!(0.5));
        assert_eq!(run.engine.convergence_check(), ConvergenceCheckMode::CashBalance);
        assert_eq!(run.rates.deposit_rate, dec!(0.03));
        assert_eq!(run.rates.overdraft_rate, dec!(0.05));
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let values = admin(&[(MAX_ITERATIONS_KEY, json!("lots"))]);
        let err = RunSettings::resolve(&values, &EngineSettings::default()).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidSetting { ref key, .. } if key == MAX_ITERATIONS_KEY));
    }

    #[test]
    fn test_iteration_limit_capped() {
        let at_cap = admin(&[(MAX_ITERATIONS_KEY, json!(MAX_ITERATIONS_CAP))]);
        let run = RunSettings::resolve(&at_cap, &EngineSettings::default()).unwrap();
        assert_eq!(run.engine.max_iterations(), MAX_ITERATIONS_CAP);

        let typo = admin(&[(MAX_ITERATIONS_KEY, json!(4_000_000_000_u32))]);
        let err = RunSettings::resolve(&typo, &EngineSettings::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid admin setting cash_engine_max_iterations: 4000000000 exceeds the cap of 1000"
        );
    }

    #[test]
    fn test_zero_iterations_rejected_by_engine() {
        let values = admin(&[(MAX_ITERATIONS_KEY, json!(0))]);
        let err = RunSettings::resolve(&values, &EngineSettings::default()).unwrap_err();
        assert!(matches!(err, ProjectionError::Engine(_)));
    }

    #[test]
    fn test_unknown_convergence_check_rejected() {
        let values = admin(&[(CONVERGENCE_CHECK_KEY, json!("balance_everything"))]);
        assert!(RunSettings::resolve(&values, &EngineSettings::default()).is_err());
    }

    #[test]
    fn test_year_range_outside_horizon_rejected() {
        let defaults = EngineSettings {
            end_year: 2060,
            ..EngineSettings::default()
        };
        assert!(RunSettings::resolve(&HashMap::new(), &defaults).is_err());
    }
}
