// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for collaborator HTTP calls.
//!
//! This module retries transient errors (timeouts, 429, 5xx) with bounded
//! exponential backoff, while failing fast on everything else. The total retry
//! budget is kept below the tick interval so a slow collaborator delays a tick
//! instead of overlapping the next one.

use crate::constants::{
    RETRY_BACKOFF_MULTIPLIER, RETRY_INITIAL_INTERVAL_MILLIS, RETRY_MAX_ELAPSED_TIME_SECS,
    RETRY_MAX_INTERVAL_SECS, RETRY_RANDOMIZATION_FACTOR,
};
use crate::errors::SyncError;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Parameters of a retry schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// First wait after a failed attempt
    pub initial_interval: Duration,
    /// Cap for any single wait
    pub max_interval: Duration,
    /// Total time budget, after which the last error is returned
    pub max_elapsed_time: Duration,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    /// # Retry Schedule
    ///
    /// 1. 200ms
    /// 2. 400ms
    /// 3. 800ms
    /// 4. 1.6s
    /// 5. 3.2s
    /// 6. 5s (capped at max interval)
    ///    7+. 5s intervals until 20 seconds elapsed
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(RETRY_INITIAL_INTERVAL_MILLIS),
            max_interval: Duration::from_secs(RETRY_MAX_INTERVAL_SECS),
            max_elapsed_time: Duration::from_secs(RETRY_MAX_ELAPSED_TIME_SECS),
            multiplier: RETRY_BACKOFF_MULTIPLIER,
            randomization_factor: RETRY_RANDOMIZATION_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries: the first error is returned as is.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_elapsed_time: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Start a fresh backoff sequence for one call.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            policy: *self,
            start_time: Instant::now(),
        }
    }
}

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter) to prevent thundering herd.
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    policy: RetryPolicy,
    start_time: Instant,
}

impl ExponentialBackoff {
    /// Get the next backoff interval, or None if the time budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let elapsed = self.start_time.elapsed();
        if elapsed >= self.policy.max_elapsed_time {
            return None;
        }

        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.policy.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.policy.max_interval);

        // Never sleep past the budget.
        let remaining = self.policy.max_elapsed_time - elapsed;
        Some(jittered.min(remaining))
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.policy.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.policy.randomization_factor;
        let min = secs - delta;
        let max = secs + delta;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range(min..=max);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Retry a collaborator call with exponential backoff.
///
/// Retries while the error reports [`SyncError::is_retryable`] and the policy's
/// time budget is not spent. Any other error is returned immediately.
///
/// # Errors
///
/// Returns the last error once it is non-retryable or the budget is exhausted.
pub async fn retry_http_call<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut backoff = policy.backoff();
    let start_time = Instant::now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "HTTP API call succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                if !e.is_retryable() {
                    debug!(
                        operation = operation_name,
                        error = %e,
                        "Non-retryable HTTP API error, failing immediately"
                    );
                    return Err(e);
                }

                if let Some(duration) = backoff.next_backoff() {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable HTTP API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                } else {
                    if attempt > 1 {
                        error!(
                            operation = operation_name,
                            attempt = attempt,
                            elapsed = ?start_time.elapsed(),
                            error = %e,
                            "Backoff exhausted, giving up"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
