//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     each transport → registry.rs (protocol → listen function)
//!
//! Bind:
//!     resolved settings → context.rs (ListenContext)
//!     → registry lookup → listen function → Box<dyn Listener>
//! ```
//!
//! # Design Decisions
//! - Protocols are plugged in at runtime; the hub never names a concrete one
//! - Only TCP ships built in; other protocols are registered by the platform

pub mod context;
pub mod protocol;
pub mod registry;
pub mod tcp;

pub use context::ListenContext;
pub use protocol::TransportProtocol;
pub use registry::{
    register_transport_listener, ListenError, ListenFunc, ListenFuture, RegistryError, TransportRegistry,
};

/// Register the built-in transports in the process-wide registry.
///
/// Safe to call more than once; already-registered protocols are skipped.
pub fn register_builtin() {
    if let Err(e) = tcp::register(TransportRegistry::global()) {
        tracing::debug!(error = %e, "Built-in transport already registered");
    }
}
