//! The listener capability every transport implements.
//!
//! # Design Decisions
//! - `close` must wake a pending `accept`, which then returns an error
//! - Listeners are owned by exactly one hub; nothing else calls them

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;

use super::connection::BoxedConnection;

/// A bound endpoint capable of accepting inbound connections.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Wait for the next inbound connection.
    async fn accept(&self) -> io::Result<BoxedConnection>;

    /// Stop accepting and release the underlying resources.
    async fn close(&self) -> io::Result<()>;

    /// Address the listener is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Error a closed listener returns from `accept`.
pub fn listener_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "listener closed")
}
