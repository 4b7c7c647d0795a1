// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry-on-conflict for Kubernetes writes.
//!
//! Ingress write-backs carry the `resourceVersion` they were read at. When
//! another writer got there first the API server answers HTTP 409; the caller
//! re-reads and tries again after a short jittered backoff, up to a fixed
//! number of attempts. Every other error fails immediately.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Initial retry interval (50ms)
const CONFLICT_INITIAL_INTERVAL_MILLIS: u64 = 50;

/// Maximum interval between retries (2 seconds)
const CONFLICT_MAX_INTERVAL_MILLIS: u64 = 2000;

/// Backoff multiplier (exponential growth factor)
const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Randomization factor to prevent thundering herd (±10%)
const RANDOMIZATION_FACTOR: f64 = 0.1;

/// Simple exponential backoff implementation.
///
/// Provides exponential backoff with randomization (jitter).
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Backoff multiplier (typically 2.0 for doubling)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
}

impl ExponentialBackoff {
    /// Get the next backoff interval and grow the current one.
    pub fn next_backoff(&mut self) -> Duration {
        let interval = self.current_interval;
        let jittered = self.apply_jitter(interval);

        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);

        jittered
    }

    /// Apply randomization (jitter) to an interval.
    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        // Uniform in [1 - factor, 1 + factor]
        let spread = 2.0 * rand::random::<f64>() - 1.0;
        let scaled = interval.as_secs_f64() * (1.0 + self.randomization_factor * spread);

        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Backoff used between optimistic-concurrency retries.
///
/// 50ms, 100ms, 200ms ... capped at 2 seconds, each ±10%.
#[must_use]
pub fn conflict_backoff() -> ExponentialBackoff {
    ExponentialBackoff {
        current_interval: Duration::from_millis(CONFLICT_INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_millis(CONFLICT_MAX_INTERVAL_MILLIS),
        multiplier: BACKOFF_MULTIPLIER,
        randomization_factor: RANDOMIZATION_FACTOR,
    }
}

/// Returns true if the error is an optimistic-concurrency conflict (HTTP 409).
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(api_err) if api_err.code == 409)
}

/// Why [`retry_on_conflict`] gave up.
#[derive(Error, Debug)]
pub enum RetryError {
    /// Every attempt hit a conflict
    #[error("still conflicting after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// The final conflict error
        last: kube::Error,
    },

    /// A non-conflict error; not retried
    #[error(transparent)]
    Fatal(kube::Error),
}

/// Run a read-modify-write operation, retrying while it conflicts.
///
/// `operation` must re-read the object on every call so the retry writes
/// against the latest `resourceVersion`.
///
/// # Errors
///
/// - [`RetryError::Fatal`] on the first non-conflict error
/// - [`RetryError::Exhausted`] after `max_attempts` conflicts
pub async fn retry_on_conflict<T, F, Fut>(
    mut operation: F,
    operation_name: &str,
    max_attempts: u32,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = conflict_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        "Kubernetes write succeeded after conflict retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if is_conflict(&e) => {
                if attempt >= max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }

                let delay = backoff.next_backoff();
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    retry_after = ?delay,
                    "Conflict writing to Kubernetes API, re-reading and retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(RetryError::Fatal(e)),
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
