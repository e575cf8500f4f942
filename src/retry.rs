//! Fixed-delay retry policy shared by extraction and delivery.
//!
//! A [`RetryPolicy`] is plain configuration: how many attempts and how long
//! to wait between them. The waiting itself goes through the [`Sleeper`]
//! seam so tests can observe delays without sleeping.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};

fn default_max_attempts() -> u32 {
    3
}

fn default_delay() -> Duration {
    Duration::from_secs(5)
}

/// Bounded retry with a fixed delay between attempts.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use team_reports::retry::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_secs(5));
/// assert_eq!(policy.max_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait between consecutive attempts.
    #[serde(with = "humantime_serde", default = "default_delay")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_delay(),
        }
    }
}

/// Something that can wait for a duration.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and delay.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Runs `attempt_fn` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    ///
    /// The closure receives the 1-based attempt number. Retryable failures
    /// are decided by [`PipelineError::is_retryable`]. When the budget runs
    /// out the last error is wrapped in [`PipelineError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        sleeper: &dyn Sleeper,
        mut attempt_fn: F,
    ) -> PipelineResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PipelineResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match attempt_fn(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) if attempt >= attempts => {
                    warn!(operation, attempts, error = %error, "Giving up");
                    return Err(PipelineError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts,
                        last_error: error.to_string(),
                    });
                }
                Err(error) => {
                    warn!(
                        operation,
                        attempt,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Attempt failed, retrying"
                    );
                    sleeper.sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
