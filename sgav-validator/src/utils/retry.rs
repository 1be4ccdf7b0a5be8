//! Provider Retry Logic
//!
//! Exponential backoff for transient provider failures, bounded both by an
//! attempt count and by the caller's request deadline.

use sgav_common::config::RetryConfig;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Why the retry loop stopped without a success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStop {
    /// Error was not retryable
    Permanent,
    /// Attempt budget used up
    Exhausted,
    /// Next backoff would cross the deadline
    Deadline,
}

/// Final error after the retry loop gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub error: E,
    pub stop: RetryStop,
}

/// Retry policy: attempt budget plus exponential backoff schedule
///
/// Backoff before attempt `n + 1` is `base_delay * 2^(n - 1)`, capped at
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Single attempt, never sleeps
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay after the given (1-based) failed attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or the next backoff would pass `deadline`.
    pub async fn run<F, Fut, T, E>(
        &self,
        operation_name: &str,
        deadline: Option<Instant>,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        self.run_if(operation_name, deadline, E::is_retryable, operation)
            .await
    }

    /// Same as [`RetryPolicy::run`] with an explicit retryable-error predicate
    pub async fn run_if<F, Fut, T, E, P>(
        &self,
        operation_name: &str,
        deadline: Option<Instant>,
        is_retryable: P,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        P: Fn(&E) -> bool,
    {
        let start_time = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if attempt > 1 {
                tracing::debug!(operation = operation_name, attempt, "Retrying provider call");
            }

            let err = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms = start_time.elapsed().as_millis() as u64,
                            "Provider call succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };

            if !is_retryable(&err) {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Provider call failed with non-retryable error"
                );
                return Err(RetryError {
                    attempts: attempt,
                    error: err,
                    stop: RetryStop::Permanent,
                });
            }

            if attempt >= self.max_attempts {
                tracing::error!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    error = %err,
                    "Provider call failed: retries exhausted"
                );
                return Err(RetryError {
                    attempts: attempt,
                    error: err,
                    stop: RetryStop::Exhausted,
                });
            }

            let backoff = self.backoff_for(attempt);

            if let Some(deadline) = deadline {
                if Instant::now() + backoff >= deadline {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Provider call failed: no time left for another attempt"
                    );
                    return Err(RetryError {
                        attempts: attempt,
                        error: err,
                        stop: RetryStop::Deadline,
                    });
                }
            }

            tracing::warn!(
                operation = operation_name,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Provider call failed, will retry after backoff"
            );

            tokio::time::sleep(backoff).await;
        }
    }
}
