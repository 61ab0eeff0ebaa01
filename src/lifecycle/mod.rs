//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Register transports → Bind inbounds
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Close hubs (set-once signal) → Join accept loops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then transports, then listeners
//! - Ordered shutdown: stop accept, close listener, wait for loops

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{start_inbounds, stop_inbounds, RunningInbound, StartupError};
