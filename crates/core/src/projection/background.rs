//! Background recalculation with retry.
//!
//! A tab edit triggers a recalculation that runs on its own tokio task. The
//! caller gets a handle exposing the task state through a `watch` channel and
//! may await the final outcome or drop the handle and move on.

use campusplan_shared::config::BackgroundSettings;
use campusplan_shared::types::{RecalculationId, VersionId};
use campusplan_shared::AppError;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::service::{CashEngineService, RecalculationOutcome};
use super::store::TabKind;

/// How often and how patiently a failed run is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay before the first retry. Doubles on each further retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` below 1 is raised to 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&BackgroundSettings::default())
    }
}

impl From<&BackgroundSettings> for RetryPolicy {
    fn from(settings: &BackgroundSettings) -> Self {
        Self::new(settings.max_attempts, Duration::from_millis(settings.backoff_ms))
    }
}

/// Observable state of a background recalculation.
#[derive(Debug, Clone)]
pub enum TaskState {
    /// Spawned, not started.
    Pending,
    /// Attempt in progress (1-based).
    Running {
        /// Current attempt.
        attempt: u32,
    },
    /// Finished with a result.
    Completed {
        /// Attempts used.
        attempts: u32,
        /// Successful outcome.
        outcome: Box<RecalculationOutcome>,
    },
    /// Gave up.
    Failed {
        /// Attempts used.
        attempts: u32,
        /// Outcome of the last attempt.
        outcome: Box<RecalculationOutcome>,
    },
}

impl TaskState {
    /// Returns true once the task can make no further progress.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Handle to a spawned recalculation.
#[derive(Debug)]
pub struct RecalculationHandle {
    /// Task identifier.
    pub id: RecalculationId,
    /// Version being recalculated.
    pub version_id: VersionId,
    state: watch::Receiver<TaskState>,
    task: JoinHandle<RecalculationOutcome>,
}

impl RecalculationHandle {
    /// Returns the current task state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state.borrow().clone()
    }

    /// Returns a receiver for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.clone()
    }

    /// Waits for the task and returns its final outcome.
    pub async fn wait(self) -> RecalculationOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => RecalculationOutcome::failed(
                self.version_id,
                &AppError::Internal(format!("recalculation task {} aborted: {err}", self.id)),
            ),
        }
    }
}

/// Spawns recalculations onto the tokio runtime.
#[derive(Clone)]
pub struct BackgroundRecalculator {
    service: CashEngineService,
    policy: RetryPolicy,
}

impl BackgroundRecalculator {
    /// Creates a recalculator over a service.
    #[must_use]
    pub const fn new(service: CashEngineService, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Starts a recalculation and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(&self, version_id: VersionId, force: bool) -> RecalculationHandle {
        let id = RecalculationId::new();
        let (sender, receiver) = watch::channel(TaskState::Pending);
        let service = self.service.clone();
        let policy = self.policy;

        let task = tokio::spawn(async move {
            run_with_retry(&service, policy, id, version_id, force, &sender).await
        });

        RecalculationHandle {
            id,
            version_id,
            state: receiver,
            task,
        }
    }

    /// Reacts to an edit of a version tab.
    ///
    /// Only P&L, balance sheet and cash flow edits of draft or published
    /// versions trigger a forced recalculation; everything else returns
    /// `None`.
    pub async fn on_tab_changed(
        &self,
        version_id: VersionId,
        tab: TabKind,
    ) -> Option<RecalculationHandle> {
        if !tab.feeds_cash_engine() {
            debug!(version_id = %version_id, tab = ?tab, "Tab does not affect projection");
            return None;
        }

        match self.service.version_status(version_id).await {
            Ok(status) if status.accepts_recalculation() => Some(self.spawn(version_id, true)),
            Ok(status) => {
                info!(
                    version_id = %version_id,
                    status = ?status,
                    "Skipping recalculation of closed version"
                );
                None
            }
            Err(err) => {
                warn!(
                    version_id = %version_id,
                    error = %err,
                    "Could not read version status, skipping recalculation"
                );
                None
            }
        }
    }
}

async fn run_with_retry(
    service: &CashEngineService,
    policy: RetryPolicy,
    id: RecalculationId,
    version_id: VersionId,
    force: bool,
    state: &watch::Sender<TaskState>,
) -> RecalculationOutcome {
    let mut attempt = 1;
    loop {
        state.send_replace(TaskState::Running { attempt });
        let outcome = run_attempt(service, id, version_id, force).await;

        if outcome.success {
            info!(task_id = %id, version_id = %version_id, attempt, "Background recalculation done");
            state.send_replace(TaskState::Completed {
                attempts: attempt,
                outcome: Box::new(outcome.clone()),
            });
            return outcome;
        }

        if !outcome.retryable || attempt >= policy.max_attempts {
            warn!(
                task_id = %id,
                version_id = %version_id,
                attempt,
                errors = ?outcome.errors,
                "Background recalculation failed"
            );
            state.send_replace(TaskState::Failed {
                attempts: attempt,
                outcome: Box::new(outcome.clone()),
            });
            return outcome;
        }

        let delay = policy.delay_after(attempt);
        warn!(
            task_id = %id,
            version_id = %version_id,
            attempt,
            retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Retrying background recalculation"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Runs one attempt on its own task so a panic still ends in a published
/// state.
async fn run_attempt(
    service: &CashEngineService,
    id: RecalculationId,
    version_id: VersionId,
    force: bool,
) -> RecalculationOutcome {
    let service = service.clone();
    let attempt = tokio::spawn(async move { service.recalculate(version_id, force).await });
    match attempt.await {
        Ok(outcome) => outcome,
        Err(err) => RecalculationOutcome::failed(
            version_id,
            &AppError::Internal(format!("recalculation task {id} failed: {err}")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_millis(250));
    }

    #[test]
    fn test_finished_states() {
        assert!(!TaskState::Pending.is_finished());
        assert!(!TaskState::Running { attempt: 1 }.is_finished());
    }
}
