//! Bounded retry with exponential backoff.
//!
//! # Responsibilities
//! - Run a unit of work up to `max_attempts` times
//! - Sleep with exponential backoff between failed attempts
//! - Let the work opt out cleanly (`Attempt::Skip`) without counting as failure
//!
//! # Design Decisions
//! - The work decides what is retryable; the policy only counts and waits
//! - No sleep after the final attempt
//! - The attempt counter lives inside `run`, so every call starts fresh

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::{apply_jitter, calculate_backoff};

/// Outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The work succeeded with a value.
    Ready(T),
    /// The work deliberately did nothing. Not an error, do not retry.
    Skip,
    /// The work failed and may be retried.
    Retry(E),
}

/// All attempts failed.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts: {last}")]
pub struct RetryError<E> {
    /// Number of attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    #[source]
    pub last: E,
}

impl<E> RetryError<E> {
    /// Consume the error, returning the final attempt's error.
    pub fn into_last(self) -> E {
        self.last
    }
}

/// Parameters of a bounded exponential-backoff retry loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
    jitter: bool,
}

impl RetryPolicy {
    /// Doubling backoff with no cap and no jitter.
    pub const fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier: 2.0,
            max_delay: None,
            jitter: false,
        }
    }

    /// Policy used by the accept loop: 10 attempts starting at 500ms.
    pub const fn accept() -> Self {
        Self::exponential(10, Duration::from_millis(500))
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Option<Duration>) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = calculate_backoff(attempt, self.base_delay, self.multiplier, self.max_delay);
        if self.jitter {
            apply_jitter(delay)
        } else {
            delay
        }
    }

    /// Run `work` until it returns `Ready` or `Skip`, or attempts run out.
    ///
    /// Returns `Ok(Some(value))` on success and `Ok(None)` when the work skipped.
    pub async fn run<T, E, F, Fut>(&self, mut work: F) -> Result<Option<T>, RetryError<E>>
    where
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match work().await {
                Attempt::Ready(value) => return Ok(Some(value)),
                Attempt::Skip => return Ok(None),
                Attempt::Retry(error) if attempt >= max_attempts => {
                    return Err(RetryError { attempts: attempt, last: error });
                }
                Attempt::Retry(error) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(attempt, delay = ?delay, error = %error, "Attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::accept()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::exponential(config.max_attempts, Duration::from_millis(config.base_delay_ms))
            .with_multiplier(config.multiplier)
            .with_max_delay(config.max_delay_ms.map(Duration::from_millis))
            .with_jitter(config.jitter)
    }
}
