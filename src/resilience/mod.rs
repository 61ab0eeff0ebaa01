//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Accept attempt fails:
//!     → retries.rs (count attempts, decide whether to try again)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Retry counts are bounded; callers decide what happens after exhaustion
//! - Backoff is deterministic unless jitter is switched on

pub mod backoff;
pub mod retries;

pub use retries::{Attempt, RetryError, RetryPolicy};
