//! Projection error types.

use campusplan_shared::AppError;
use thiserror::Error;

use super::store::StoreError;
use crate::cash_engine::CashEngineError;
use crate::metrics::MetricsError;

/// Errors raised while orchestrating a projection run.
///
/// These never escape [`CashEngineService::recalculate`]; they are folded into
/// the returned outcome.
///
/// [`CashEngineService::recalculate`]: super::CashEngineService::recalculate
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An admin setting is present but unusable.
    #[error("invalid admin setting {key}: {reason}")]
    InvalidSetting {
        /// Setting key.
        key: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// Engine configuration or year range rejected, or a metric overflowed.
    #[error(transparent)]
    Engine(#[from] CashEngineError),

    /// Statement line items summed past the decimal range.
    #[error("could not extract engine input: {0}")]
    Extraction(#[from] MetricsError),

    /// The engine task panicked or was cancelled.
    #[error("cash engine task failed: {0}")]
    EngineTask(tokio::task::JoinError),

    /// Reading from a store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing a batch of metric rows failed. Earlier batches stay written.
    #[error("persisting batch {batch} of {total} failed: {source}")]
    Persist {
        /// 1-based batch number.
        batch: usize,
        /// Number of batches in the run.
        total: usize,
        /// Underlying store error.
        source: StoreError,
    },

    /// The result could not be encoded as a computed artifact.
    #[error("could not serialize projection result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProjectionError {
    /// Create an invalid setting error.
    #[must_use]
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<ProjectionError> for AppError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::InvalidSetting { .. } => Self::Configuration(err.to_string()),
            ProjectionError::Engine(CashEngineError::Metrics(_))
            | ProjectionError::Extraction(_)
            | ProjectionError::EngineTask(_)
            | ProjectionError::Serialization(_) => Self::Internal(err.to_string()),
            ProjectionError::Engine(_) => Self::Validation(err.to_string()),
            ProjectionError::Store(StoreError::NotFound(_)) => Self::NotFound(err.to_string()),
            ProjectionError::Store(_) | ProjectionError::Persist { .. } => {
                Self::Storage(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKey;

    #[test]
    fn test_persist_failure_is_transient_storage_error() {
        let err = ProjectionError::Persist {
            batch: 3,
            total: 7,
            source: StoreError::Unavailable("connection reset".into()),
        };
        assert_eq!(
            err.to_string(),
            "persisting batch 3 of 7 failed: store unavailable: connection reset"
        );
        let app: AppError = err.into();
        assert_eq!(app.error_code(), "STORAGE_ERROR");
        assert!(app.is_transient());
    }

    #[test]
    fn test_missing_version_maps_to_not_found() {
        let app: AppError = ProjectionError::Store(StoreError::NotFound("v1".into())).into();
        assert_eq!(app.error_code(), "NOT_FOUND");
        assert!(!app.is_transient());
    }

    #[test]
    fn test_engine_errors_are_validation_errors() {
        let app: AppError = ProjectionError::Engine(CashEngineError::InvalidMaxIterations).into();
        assert_eq!(app.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_metric_overflow_is_internal_error() {
        let err = ProjectionError::Engine(CashEngineError::Metrics(MetricsError::Overflow(
            MetricKey::GrossProfit,
        )));
        let app: AppError = err.into();
        assert_eq!(app.error_code(), "INTERNAL_ERROR");
        assert_eq!(
            app.to_string(),
            "Internal error: gross_profit overflowed the decimal range"
        );
        assert!(!app.is_transient());
    }

    #[tokio::test]
    async fn test_panicked_engine_task_is_internal_error() {
        let join_error = tokio::task::spawn_blocking::<_, ()>(|| panic!("engine blew up"))
            .await
            .unwrap_err();
        let app: AppError = ProjectionError::EngineTask(join_error).into();
        assert_eq!(app.error_code(), "INTERNAL_ERROR");
        assert!(app.to_string().contains("engine blew up"));
    }

    #[test]
    fn test_bad_setting_is_configuration_error() {
        let app: AppError =
            ProjectionError::invalid_setting("cash_engine_tolerance", "not a number").into();
        assert_eq!(app.error_code(), "CONFIGURATION_ERROR");
        assert!(app.to_string().contains("cash_engine_tolerance"));
    }
}
