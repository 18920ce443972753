//! Storage seams for the projection service.
//!
//! Tab input, admin settings and computed output live in external systems.
//! The service only sees them through these traits.

use async_trait::async_trait;
use campusplan_shared::types::{VersionId, Year};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::metrics::MetricKey;

/// Key under which the full multi-year result is stored.
pub const COMPUTED_KEY: &str = "cash_engine_convergence";

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Store temporarily unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store rejected the operation.
    #[error("store error: {0}")]
    Backend(String),
}

/// Lifecycle status of a budget version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// Being edited.
    Draft,
    /// Shared but still editable.
    Published,
    /// Frozen.
    Locked,
    /// Retired.
    Archived,
}

impl VersionStatus {
    /// Returns true if tab changes may trigger a recalculation.
    #[must_use]
    pub const fn accepts_recalculation(self) -> bool {
        matches!(self, Self::Draft | Self::Published)
    }
}

/// Input tabs of a budget version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    /// Profit and loss.
    Pnl,
    /// Balance sheet.
    BalanceSheet,
    /// Cash flow statement.
    CashFlow,
    /// Student enrolment.
    Enrollment,
    /// Curriculum tuition and staffing.
    Curriculum,
    /// Rent model.
    Rent,
    /// Capital expenditure schedule.
    Capex,
}

impl TabKind {
    /// Returns true for the three statements the cash engine reads.
    #[must_use]
    pub const fn feeds_cash_engine(self) -> bool {
        matches!(self, Self::Pnl | Self::BalanceSheet | Self::CashFlow)
    }
}

/// Raw statement payloads of one version. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionTabs {
    /// Profit and loss payload.
    #[serde(default)]
    pub pnl: Option<Value>,
    /// Balance sheet payload.
    #[serde(default)]
    pub balance_sheet: Option<Value>,
    /// Cash flow payload.
    #[serde(default)]
    pub cash_flow: Option<Value>,
}

/// One persisted metric value, unique per (version, year, metric).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Owning version.
    pub version_id: VersionId,
    /// Projection year.
    pub year: Year,
    /// Metric name.
    pub metric_key: MetricKey,
    /// Metric value.
    pub value: Decimal,
    /// True for actuals (2023, 2024).
    pub is_historical: bool,
}

/// Serialized multi-year result attached to a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedArtifact {
    /// Owning version.
    pub version_id: VersionId,
    /// Artifact name, [`COMPUTED_KEY`] for engine output.
    pub computed_key: String,
    /// JSON-encoded result.
    pub computed_value: Value,
    /// When the result was produced.
    pub computed_at: DateTime<Utc>,
}

/// Source of raw statement tabs.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// Loads the P&L, balance sheet and cash flow payloads of a version.
    async fn load_tabs(&self, version_id: VersionId) -> Result<VersionTabs, StoreError>;

    /// Returns the lifecycle status of a version.
    async fn version_status(&self, version_id: VersionId) -> Result<VersionStatus, StoreError>;
}

/// Source of admin-maintained settings.
#[async_trait]
pub trait AdminSettingsSource: Send + Sync {
    /// Loads every admin setting as key/JSON value pairs.
    async fn load_settings(&self) -> Result<HashMap<String, Value>, StoreError>;
}

/// Sink for computed metrics and artifacts.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Inserts or replaces rows by (version, year, metric).
    async fn upsert_metrics(&self, rows: &[MetricRow]) -> Result<(), StoreError>;

    /// Inserts or replaces an artifact by (version, key).
    async fn save_computed(&self, artifact: ComputedArtifact) -> Result<(), StoreError>;

    /// Loads an artifact, if one was saved.
    async fn load_computed(
        &self,
        version_id: VersionId,
        computed_key: &str,
    ) -> Result<Option<ComputedArtifact>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_open_versions_accept_recalculation() {
        assert!(VersionStatus::Draft.accepts_recalculation());
        assert!(VersionStatus::Published.accepts_recalculation());
        assert!(!VersionStatus::Locked.accepts_recalculation());
        assert!(!VersionStatus::Archived.accepts_recalculation());
    }

    #[test]
    fn test_statement_tabs_feed_engine() {
        assert!(TabKind::Pnl.feeds_cash_engine());
        assert!(TabKind::BalanceSheet.feeds_cash_engine());
        assert!(TabKind::CashFlow.feeds_cash_engine());
        assert!(!TabKind::Enrollment.feeds_cash_engine());
        assert!(!TabKind::Rent.feeds_cash_engine());
    }

    #[test]
    fn test_tabs_tolerate_missing_payloads() {
        let tabs: VersionTabs = serde_json::from_str(r#"{"pnl": {"revenue": 10}}"#).unwrap();
        assert!(tabs.pnl.is_some());
        assert!(tabs.balance_sheet.is_none());
        assert!(tabs.cash_flow.is_none());
    }
}
