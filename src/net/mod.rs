//! Network layer primitives.
//!
//! # Data Flow
//! ```text
//! Transport listener (listener.rs)
//!     → accept() yields a Connection (connection.rs)
//!     → ConnectionTracker ticket follows the handler task
//!     → Hand off to the connection handler
//! ```
//!
//! # Design Decisions
//! - Transports are type-erased behind `Listener` and `Connection`
//! - Addresses may be domains; transports resolve them at bind time

pub mod address;
pub mod connection;
pub mod listener;

pub use address::{Address, Endpoint};
pub use connection::{BoxedConnection, Connection, ConnectionId, ConnectionTracker, HandlerTicket};
pub use listener::Listener;
