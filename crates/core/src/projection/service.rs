//! Cash engine service: one full projection run per version.

use campusplan_shared::config::{AppConfig, EngineSettings};
use campusplan_shared::types::{VersionId, Year};
use campusplan_shared::AppError;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::cache::ProjectionCache;
use super::error::ProjectionError;
use super::extract::{extract_base_record, replicate_across_years};
use super::settings::RunSettings;
use super::store::{
    AdminSettingsSource, COMPUTED_KEY, ComputedArtifact, MetricRow, MetricStore, StoreError,
    TabSource, VersionStatus,
};
use crate::cash_engine::{CashEngine, MultiYearResult};
use crate::metrics::PERSISTED_METRICS;

/// Metric rows written per store call.
pub const PERSIST_BATCH_SIZE: usize = 100;

/// Result of a recalculation request.
///
/// Failures are reported here rather than as `Err`; `errors` holds
/// `[CODE] message` strings.
#[derive(Debug, Clone, Serialize)]
pub struct RecalculationOutcome {
    /// Version the run was for.
    pub version_id: VersionId,
    /// True when a result is available.
    pub success: bool,
    /// True when the result came from the cache or the stored artifact.
    pub cached: bool,
    /// Number of years in the result.
    pub years_computed: usize,
    /// Number of years that converged.
    pub converged_years: usize,
    /// Years that hit the iteration limit.
    pub unconverged_years: Vec<Year>,
    /// Metric rows written by this run.
    pub rows_persisted: usize,
    /// True when the failure may clear up on retry.
    pub retryable: bool,
    /// Error messages, empty on success.
    pub errors: Vec<String>,
    /// Full multi-year result.
    #[serde(skip)]
    pub result: Option<Arc<MultiYearResult>>,
}

impl RecalculationOutcome {
    fn succeeded(
        version_id: VersionId,
        result: Arc<MultiYearResult>,
        cached: bool,
        rows_persisted: usize,
    ) -> Self {
        let summary = result.summary();
        Self {
            version_id,
            success: true,
            cached,
            years_computed: summary.years,
            converged_years: summary.converged_years,
            unconverged_years: summary.unconverged,
            rows_persisted,
            retryable: false,
            errors: Vec::new(),
            result: Some(result),
        }
    }

    /// Builds a failed outcome from an application error.
    #[must_use]
    pub fn failed(version_id: VersionId, err: &AppError) -> Self {
        Self {
            version_id,
            success: false,
            cached: false,
            years_computed: 0,
            converged_years: 0,
            unconverged_years: Vec::new(),
            rows_persisted: 0,
            retryable: err.is_transient(),
            errors: vec![format!("[{}] {err}", err.error_code())],
            result: None,
        }
    }
}

/// Orchestrates extraction, the multi-year engine run, persistence and
/// caching.
///
/// Cloning is cheap; clones share stores and cache.
#[derive(Clone)]
pub struct CashEngineService {
    tabs: Arc<dyn TabSource>,
    admin: Arc<dyn AdminSettingsSource>,
    metrics: Arc<dyn MetricStore>,
    cache: ProjectionCache,
    defaults: EngineSettings,
}

impl CashEngineService {
    /// Creates a service over the given stores.
    #[must_use]
    pub fn new(
        tabs: Arc<dyn TabSource>,
        admin: Arc<dyn AdminSettingsSource>,
        metrics: Arc<dyn MetricStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            tabs,
            admin,
            metrics,
            cache: ProjectionCache::from_settings(&config.cache),
            defaults: config.engine.clone(),
        }
    }

    /// Returns the result cache.
    #[must_use]
    pub const fn cache(&self) -> &ProjectionCache {
        &self.cache
    }

    /// Returns the lifecycle status of a version.
    pub async fn version_status(&self, version_id: VersionId) -> Result<VersionStatus, StoreError> {
        self.tabs.version_status(version_id).await
    }

    /// Computes (or reuses) the projection for a version.
    ///
    /// Without `force`, a cached or stored result is returned as is. Never
    /// fails; errors are folded into the outcome. The engine runs on the
    /// blocking pool, so even a panic inside it comes back as an
    /// `INTERNAL_ERROR` outcome.
    pub async fn recalculate(&self, version_id: VersionId, force: bool) -> RecalculationOutcome {
        match self.run(version_id, force).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let err = AppError::from(err);
                error!(
                    version_id = %version_id,
                    error_code = err.error_code(),
                    error = %err,
                    "Projection run failed"
                );
                RecalculationOutcome::failed(version_id, &err)
            }
        }
    }

    async fn run(
        &self,
        version_id: VersionId,
        force: bool,
    ) -> Result<RecalculationOutcome, ProjectionError> {
        if !force && let Some(result) = self.cached_result(version_id).await? {
            debug!(version_id = %version_id, "Reusing cached projection");
            return Ok(RecalculationOutcome::succeeded(version_id, result, true, 0));
        }

        let admin = self.admin.load_settings().await?;
        let settings = RunSettings::resolve(&admin, &self.defaults)?;
        let tabs = self.tabs.load_tabs(version_id).await?;

        let base = extract_base_record(&tabs)?;
        let inputs = replicate_across_years(&base, settings.start_year, settings.end_year);

        info!(
            version_id = %version_id,
            start_year = settings.start_year.value(),
            end_year = settings.end_year.value(),
            base_metrics = base.len(),
            "Running cash engine"
        );

        let engine = CashEngine::new(settings.engine, settings.rates);
        let (start_year, end_year) = (settings.start_year, settings.end_year);
        let result = tokio::task::spawn_blocking(move || {
            engine.run_years(start_year, end_year, &inputs)
        })
        .await
        .map_err(ProjectionError::EngineTask)??;

        let rows = metric_rows(version_id, &result);
        self.persist(&rows).await?;

        let artifact = ComputedArtifact {
            version_id,
            computed_key: COMPUTED_KEY.to_string(),
            computed_value: serde_json::to_value(&result)?,
            computed_at: Utc::now(),
        };
        self.metrics.save_computed(artifact).await?;

        let result = Arc::new(result);
        self.cache.insert(version_id, Arc::clone(&result));

        let outcome = RecalculationOutcome::succeeded(version_id, result, false, rows.len());
        if outcome.unconverged_years.is_empty() {
            info!(
                version_id = %version_id,
                years = outcome.years_computed,
                rows = outcome.rows_persisted,
                "Projection complete"
            );
        } else {
            warn!(
                version_id = %version_id,
                years = outcome.years_computed,
                unconverged = outcome.unconverged_years.len(),
                "Projection complete with unconverged years"
            );
        }
        Ok(outcome)
    }

    async fn cached_result(
        &self,
        version_id: VersionId,
    ) -> Result<Option<Arc<MultiYearResult>>, ProjectionError> {
        if let Some(result) = self.cache.get(version_id) {
            return Ok(Some(result));
        }

        let Some(artifact) = self.metrics.load_computed(version_id, COMPUTED_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<MultiYearResult>(artifact.computed_value) {
            Ok(result) => {
                let result = Arc::new(result);
                self.cache.insert(version_id, Arc::clone(&result));
                Ok(Some(result))
            }
            Err(err) => {
                warn!(
                    version_id = %version_id,
                    error = %err,
                    "Ignoring unreadable stored projection"
                );
                Ok(None)
            }
        }
    }

    /// Writes rows in batches, stopping at the first failed batch.
    async fn persist(&self, rows: &[MetricRow]) -> Result<(), ProjectionError> {
        let total = rows.len().div_ceil(PERSIST_BATCH_SIZE);
        for (index, batch) in rows.chunks(PERSIST_BATCH_SIZE).enumerate() {
            self.metrics
                .upsert_metrics(batch)
                .await
                .map_err(|source| ProjectionError::Persist {
                    batch: index + 1,
                    total,
                    source,
                })?;
            debug!(batch = index + 1, total, rows = batch.len(), "Persisted metric batch");
        }
        Ok(())
    }
}

/// Flattens a result into persisted rows, skipping unset metrics.
pub fn metric_rows(version_id: VersionId, result: &MultiYearResult) -> Vec<MetricRow> {
    result
        .years
        .values()
        .flat_map(|outcome| {
            PERSISTED_METRICS.iter().filter_map(move |&metric_key| {
                outcome.metrics.get(metric_key).map(|value| MetricRow {
                    version_id,
                    year: outcome.year,
                    metric_key,
                    value,
                    is_historical: outcome.year.is_historical(),
                })
            })
        })
        .collect()
}
