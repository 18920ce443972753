//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Cash engine defaults. Admin settings override these per run.
    #[serde(default)]
    pub engine: EngineSettings,
    /// Projection result cache configuration.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Background recalculation retry configuration.
    #[serde(default)]
    pub background: BackgroundSettings,
}

/// Cash engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Upper bound on convergence iterations per year.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Maximum absolute difference accepted by the balance checks.
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
    /// Convergence predicate: `bs_cf_balance` or `cash_balance`.
    #[serde(default = "default_convergence_check")]
    pub convergence_check: String,
    /// Annual rate earned on a positive average cash balance.
    #[serde(default = "default_deposit_rate")]
    pub deposit_rate: Decimal,
    /// Annual rate charged on a negative average cash balance.
    #[serde(default = "default_overdraft_rate")]
    pub overdraft_rate: Decimal,
    /// First year of the projection run.
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    /// Last year of the projection run (inclusive).
    #[serde(default = "default_end_year")]
    pub end_year: i32,
}

fn default_max_iterations() -> u32 {
    3
}

fn default_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_convergence_check() -> String {
    "bs_cf_balance".to_string()
}

fn default_deposit_rate() -> Decimal {
    Decimal::new(2, 2) // 2%
}

fn default_overdraft_rate() -> Decimal {
    Decimal::new(5, 2) // 5%
}

fn default_start_year() -> i32 {
    2025
}

fn default_end_year() -> i32 {
    2052
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            convergence_check: default_convergence_check(),
            deposit_rate: default_deposit_rate(),
            overdraft_rate: default_overdraft_rate(),
            start_year: default_start_year(),
            end_year: default_end_year(),
        }
    }
}

/// Projection cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of versions kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    /// Time-to-live for each cached result in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_capacity() -> u64 {
    100
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Background recalculation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundSettings {
    /// Total attempts per triggered recalculation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    250
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("CAMPUSPLAN").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
