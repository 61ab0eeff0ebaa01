//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate the delay to wait after failed attempt number `attempt` (1-based).
///
/// The delay is `base * multiplier^(attempt - 1)`, optionally capped at `max`.
/// Attempt 0 never waits.
pub fn calculate_backoff(attempt: u32, base: Duration, multiplier: f64, max: Option<Duration>) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let delay_ms = base.as_millis() as f64 * multiplier.powi(exponent);
    let delay = if delay_ms.is_finite() && delay_ms < u64::MAX as f64 {
        Duration::from_millis(delay_ms as u64)
    } else {
        Duration::from_millis(u64::MAX)
    };

    match max {
        Some(max) => delay.min(max),
        None => delay,
    }
}

/// Apply jitter of 0 to 10% on top of `delay`.
pub fn apply_jitter(delay: Duration) -> Duration {
    let jitter_range = delay.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    delay.saturating_add(Duration::from_millis(jitter))
}
