//! Projection orchestration.
//!
//! Pulls raw tab input and admin settings from external stores, drives the
//! cash engine across the planning horizon, persists per-year metric rows and
//! caches the full result per version. Background recalculation with retry
//! lives in [`background`].

pub mod background;
pub mod cache;
pub mod error;
pub mod extract;
pub mod memory;
pub mod service;
pub mod settings;
pub mod store;

pub use background::{BackgroundRecalculator, RecalculationHandle, RetryPolicy, TaskState};
pub use cache::ProjectionCache;
pub use error::ProjectionError;
pub use extract::{extract_base_record, replicate_across_years};
pub use memory::InMemoryStore;
pub use service::{CashEngineService, PERSIST_BATCH_SIZE, RecalculationOutcome};
pub use settings::{MAX_ITERATIONS_CAP, RunSettings};
pub use store::{
    AdminSettingsSource, COMPUTED_KEY, ComputedArtifact, MetricRow, MetricStore, StoreError,
    TabKind, TabSource, VersionStatus, VersionTabs,
};
