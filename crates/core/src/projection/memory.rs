//! In-memory store used by tests and the command-line driver.
//!
//! Implements all three storage traits and can be told to fail, so the
//! service's error paths can be exercised without a database.

use async_trait::async_trait;
use campusplan_shared::types::{VersionId, Year};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::store::{
    AdminSettingsSource, ComputedArtifact, MetricRow, MetricStore, StoreError, TabSource,
    VersionStatus, VersionTabs,
};
use crate::metrics::MetricKey;

type RowKey = (VersionId, Year, MetricKey);

#[derive(Default)]
struct State {
    versions: HashMap<VersionId, (VersionStatus, VersionTabs)>,
    settings: HashMap<String, Value>,
    rows: BTreeMap<RowKey, MetricRow>,
    artifacts: HashMap<(VersionId, String), ComputedArtifact>,
    /// Upsert calls allowed before every further call fails.
    upsert_budget: Option<usize>,
}

/// Thread-safe in-memory implementation of the projection stores.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    failing_tab_loads: AtomicUsize,
    tab_loads: AtomicUsize,
    upsert_calls: AtomicUsize,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a version and its tabs.
    pub fn insert_version(&self, version_id: VersionId, status: VersionStatus, tabs: VersionTabs) {
        self.state().versions.insert(version_id, (status, tabs));
    }

    /// Changes the status of a known version.
    pub fn set_status(&self, version_id: VersionId, status: VersionStatus) {
        if let Some(entry) = self.state().versions.get_mut(&version_id) {
            entry.0 = status;
        }
    }

    /// Sets one admin setting.
    pub fn set_admin_setting(&self, key: impl Into<String>, value: Value) {
        self.state().settings.insert(key.into(), value);
    }

    /// Lets `calls` more upserts succeed, then fails every later one.
    pub fn fail_upserts_after(&self, calls: usize) {
        let done = self.upsert_calls();
        self.state().upsert_budget = Some(done.saturating_add(calls));
    }

    /// Removes any upsert failure.
    pub fn clear_upsert_failure(&self) {
        self.state().upsert_budget = None;
    }

    /// Makes the next `count` tab loads fail as unavailable.
    pub fn fail_next_tab_loads(&self, count: usize) {
        self.failing_tab_loads.store(count, Ordering::SeqCst);
    }

    /// Returns the stored rows of a version in (year, metric) order.
    #[must_use]
    pub fn rows_for(&self, version_id: VersionId) -> Vec<MetricRow> {
        self.state()
            .rows
            .values()
            .filter(|row| row.version_id == version_id)
            .cloned()
            .collect()
    }

    /// Returns the stored artifact of a version, if any.
    #[must_use]
    pub fn artifact(&self, version_id: VersionId, computed_key: &str) -> Option<ComputedArtifact> {
        self.state()
            .artifacts
            .get(&(version_id, computed_key.to_string()))
            .cloned()
    }

    /// Number of `load_tabs` calls so far, failed ones included.
    #[must_use]
    pub fn tab_loads(&self) -> usize {
        self.tab_loads.load(Ordering::SeqCst)
    }

    /// Number of `upsert_metrics` calls so far, failed ones included.
    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabSource for InMemoryStore {
    async fn load_tabs(&self, version_id: VersionId) -> Result<VersionTabs, StoreError> {
        self.tab_loads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_tab_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::Unavailable("tab storage timed out".into()));
        }

        self.state()
            .versions
            .get(&version_id)
            .map(|(_, tabs)| tabs.clone())
            .ok_or_else(|| StoreError::NotFound(format!("version {version_id}")))
    }

    async fn version_status(&self, version_id: VersionId) -> Result<VersionStatus, StoreError> {
        self.state()
            .versions
            .get(&version_id)
            .map(|(status, _)| *status)
            .ok_or_else(|| StoreError::NotFound(format!("version {version_id}")))
    }
}

#[async_trait]
impl AdminSettingsSource for InMemoryStore {
    async fn load_settings(&self) -> Result<HashMap<String, Value>, StoreError> {
        Ok(self.state().settings.clone())
    }
}

#[async_trait]
impl MetricStore for InMemoryStore {
    async fn upsert_metrics(&self, rows: &[MetricRow]) -> Result<(), StoreError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if state.upsert_budget.is_some_and(|budget| call >= budget) {
            return Err(StoreError::Unavailable("metric store rejected batch".into()));
        }
        for row in rows {
            state
                .rows
                .insert((row.version_id, row.year, row.metric_key), row.clone());
        }
        Ok(())
    }

    async fn save_computed(&self, artifact: ComputedArtifact) -> Result<(), StoreError> {
        self.state()
            .artifacts
            .insert((artifact.version_id, artifact.computed_key.clone()), artifact);
        Ok(())
    }

    async fn load_computed(
        &self,
        version_id: VersionId,
        computed_key: &str,
    ) -> Result<Option<ComputedArtifact>, StoreError> {
        Ok(self.artifact(version_id, computed_key))
    }
}
