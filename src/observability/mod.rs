//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Hub and transports produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Operator-attention accept failures log at WARN, everything else at INFO
//! - Connection IDs flow through handler spans

pub mod logging;
pub mod metrics;
