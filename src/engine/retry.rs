//! engine::retry
//!
//! Retry loop for lock contention.
//!
//! Two processes racing for `index.lock` or a ref lock is routine when a
//! panel refreshes while the user commits. Those failures are retried with a
//! quadratic backoff (`attempt² × base`) before they surface.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use super::operation::Operation;
use crate::core::config::RefreshConfig;
use crate::git::{GitError, GitErrorKind, GitResult};

/// Attempt budget and backoff unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl From<&RefreshConfig> for RetryPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Sleep after the failed `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt.saturating_mul(attempt)
    }

    /// Whether `err` from `operation` is worth another attempt.
    pub fn should_retry(&self, operation: &Operation, err: &GitError) -> bool {
        match err.kind {
            Some(GitErrorKind::RepositoryIsLocked) => true,
            Some(GitErrorKind::CantLockRef | GitErrorKind::CantRebaseMultipleBranches) => {
                operation.retry_eligible
            }
            _ => false,
        }
    }
}

/// Run `f` until it succeeds, fails for a non-retryable reason, or the
/// attempt budget is spent.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &Operation, mut f: F) -> GitResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GitResult<T>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.attempts && policy.should_retry(operation, &err) => {
                let delay = policy.delay(attempt);
                warn!(
                    operation = %operation.kind,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    kind = ?err.kind,
                    "retrying after lock contention"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
