//! Accepted connections and their lifecycle tracking.
//!
//! # Responsibilities
//! - Define the byte-stream capability every transport hands to handlers
//! - Label each handed-off connection for tracing
//! - Count handler tasks still in flight

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// An established bidirectional byte stream produced by a [`Listener`].
///
/// [`Listener`]: crate::net::Listener
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {
    /// Address of the remote peer.
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Local address the connection was accepted on.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Owned, type-erased connection as handed to handlers.
pub type BoxedConnection = Box<dyn Connection>;

impl Connection for TcpStream {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::peer_addr(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }
}

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique label for an accepted connection, shown in handler spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// In-flight handler tasks of one hub.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    in_flight: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an id to a connection about to be handed off. The handler
    /// task owns the returned ticket until it finishes.
    pub fn begin(&self) -> HandlerTicket {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        HandlerTicket {
            id: ConnectionId::next(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Held by a handler task; released when the task ends, panics included.
#[derive(Debug)]
pub struct HandlerTicket {
    id: ConnectionId,
    in_flight: Arc<AtomicU64>,
}

impl HandlerTicket {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for HandlerTicket {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(connection_id = %self.id, "Handler released");
    }
}
