//! Retry executor with exponential backoff and jitter.
//!
//! Attempt 0 runs immediately. Before each later attempt the executor
//! sleeps, and the sleep grows as
//!
//! ```text
//! delay(0)   = initial_delay
//! delay(n+1) = min(delay(n) × 2 × j, max_delay)      j ∈ [1 − J, 1 + J]
//! ```
//!
//! where `J` is [`RetryPolicy::jitter`]. The random factor keeps many
//! clients that failed together from retrying in lockstep.
//!
//! After every failure the error is asked [`Retryable::is_retryable`]. A
//! permanent failure stops the loop at once; a transient one consumes an
//! attempt. At most `max_retries + 1` attempts are made.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::LoadError;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Relative jitter `J`, in `[0, 1)`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            jitter: 0.10,
        }
    }
}

/// Infinite iterator over backoff delays.
pub struct Backoff<R: Rng> {
    next: Duration,
    max: Duration,
    jitter: f64,
    rng: R,
}

impl<R: Rng> Backoff<R> {
    pub fn new(policy: &RetryPolicy, rng: R) -> Self {
        Self {
            next: policy.initial_delay,
            max: policy.max_delay,
            jitter: policy.jitter.clamp(0.0, 0.999),
            rng,
        }
    }
}

impl<R: Rng> Iterator for Backoff<R> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next.min(self.max);
        let factor = if self.jitter > 0.0 {
            self.rng.gen_range((1.0 - self.jitter)..=(1.0 + self.jitter))
        } else {
            1.0
        };
        self.next = current.mul_f64(2.0 * factor).min(self.max);
        Some(current)
    }
}

/// How the executor gave up.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// The last error was permanent.
    Aborted { attempts: u32, error: E },
    /// Every allowed attempt failed with a transient error.
    Exhausted { attempts: u32, error: E },
}

impl<E> RetryFailure<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryFailure::Aborted { attempts, .. } | RetryFailure::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryFailure::Aborted { error, .. } | RetryFailure::Exhausted { error, .. } => error,
        }
    }
}

impl From<RetryFailure<LoadError>> for LoadError {
    fn from(failure: RetryFailure<LoadError>) -> Self {
        match failure {
            RetryFailure::Aborted { error, .. } => error,
            RetryFailure::Exhausted { attempts, error } => LoadError::RetriesExhausted {
                attempts,
                source: Box::new(error),
            },
        }
    }
}

/// Run `op` under `policy`, seeding jitter from the OS.
///
/// `op` receives the zero-based attempt number.
pub async fn with_exponential_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    op: F,
) -> Result<T, RetryFailure<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_backoff_rng(policy, StdRng::from_entropy(), op).await
}

/// Same as [`with_exponential_backoff`] with a caller-supplied RNG.
pub async fn with_backoff_rng<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    rng: R,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Rng,
{
    let mut delays = Backoff::new(policy, rng);
    let mut attempt = 0u32;

    loop {
        let err = match op(attempt).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };
        let attempts = attempt + 1;

        if !err.is_retryable() {
            debug!(attempts, error = %err, "permanent failure, not retrying");
            return Err(RetryFailure::Aborted {
                attempts,
                error: err,
            });
        }
        if attempt >= policy.max_retries {
            warn!(attempts, error = %err, "retries exhausted");
            return Err(RetryFailure::Exhausted {
                attempts,
                error: err,
            });
        }

        let delay = delays.next().unwrap_or(policy.max_delay);
        warn!(
            attempt = attempts,
            max_attempts = policy.max_retries + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Cancel `fut` if it has not finished within `limit`.
///
/// Only the wrapped attempt is abandoned; the surrounding retry budget is
/// unaffected.
pub async fn with_timeout<T, Fut>(limit: Duration, fut: Fut) -> Result<T, LoadError>
where
    Fut: Future<Output = Result<T, LoadError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(LoadError::Timeout {
            ms: limit.as_millis() as u64,
        }),
    }
}
