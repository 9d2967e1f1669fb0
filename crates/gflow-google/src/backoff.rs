//! Bounded exponential backoff.
//!
//! The n-th wait (0-based) is `min(max_delay, initial_delay * factor^n)` and
//! an operation is abandoned after `max_attempts` consecutive failures.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{AuthError, AuthResult};
use crate::events::{RetryEvent, RetryNotifier, RetryOperation};

/// Backoff parameters shared by token refresh and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// First wait.
    #[serde(with = "duration_ms")]
    pub initial_delay: Duration,
    /// Upper bound on any single wait.
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    /// Growth factor between consecutive waits.
    pub factor: u32,
    /// Attempts before giving up, including the first one.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(73_000),
            factor: 9,
            max_attempts: 4,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with explicit parameters.
    pub fn new(initial_delay: Duration, max_delay: Duration, factor: u32, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay,
            factor,
            max_attempts,
        }
    }

    /// Builder: set the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the wait before retry `n` (0-based).
    pub fn delay_for(&self, n: u32) -> Duration {
        self.factor
            .checked_pow(n)
            .and_then(|multiplier| self.initial_delay.checked_mul(multiplier))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Returns every wait a fully failing operation goes through.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.effective_attempts().saturating_sub(1)).map(|n| self.delay_for(n))
    }

    fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget runs out.
    ///
    /// `attempt` receives the 1-based attempt number. Exhaustion is reported
    /// as [`AuthError::TooManyRefreshAttempts`] wrapping the last error.
    pub(crate) async fn run<T, F, Fut>(
        &self,
        operation: RetryOperation,
        notifier: &RetryNotifier,
        mut attempt: F,
    ) -> AuthResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AuthResult<T>>,
    {
        let max_attempts = self.effective_attempts();
        let mut number = 1;

        loop {
            let err = match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            if number >= max_attempts {
                error!(
                    operation = %operation,
                    attempts = number,
                    error = %err,
                    "giving up after repeated failures"
                );
                return Err(AuthError::TooManyRefreshAttempts {
                    attempts: number,
                    last_error: Box::new(err),
                });
            }

            let delay = self.delay_for(number - 1);
            warn!(
                operation = %operation,
                attempt = number,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            notifier.notify(&RetryEvent {
                operation,
                attempt: number,
                delay,
                reason: err.to_string(),
            });

            tokio::time::sleep(delay).await;
            number += 1;
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
