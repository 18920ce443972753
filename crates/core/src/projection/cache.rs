//! Projection result caching using Moka.
//!
//! Keeps the latest multi-year result per version in memory, in front of the
//! persisted computed artifact.

use campusplan_shared::config::CacheSettings;
use campusplan_shared::types::VersionId;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::cash_engine::MultiYearResult;

/// Default cache capacity (number of versions).
const DEFAULT_CACHE_CAPACITY: u64 = 100;

/// Default time-to-live for cache entries (1 hour).
const DEFAULT_TTL_SECS: u64 = 3600;

/// Cache for projection results, keyed by version.
///
/// Cloning is cheap and clones share entries.
#[derive(Clone)]
pub struct ProjectionCache {
    cache: Cache<VersionId, Arc<MultiYearResult>>,
}

impl ProjectionCache {
    /// Creates a cache with default settings.
    ///
    /// Default: 100 versions max, 1 hour TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of versions to cache
    /// * `ttl_secs` - Time-to-live in seconds for each entry
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Creates a cache from application settings.
    #[must_use]
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::with_config(settings.max_capacity, settings.ttl_secs)
    }

    /// Returns the cached result for a version.
    #[must_use]
    pub fn get(&self, version_id: VersionId) -> Option<Arc<MultiYearResult>> {
        self.cache.get(&version_id)
    }

    /// Stores the result for a version, replacing any previous one.
    pub fn insert(&self, version_id: VersionId, result: Arc<MultiYearResult>) {
        self.cache.insert(version_id, result);
    }

    /// Invalidates the entry for a version.
    pub fn invalidate(&self, version_id: VersionId) {
        self.cache.invalidate(&version_id);
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks.
    ///
    /// Moka handles this in the background; calling it makes counts and
    /// invalidations visible immediately.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new()
    }
}
