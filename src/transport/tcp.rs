//! Plain TCP transport.
//!
//! # Responsibilities
//! - Bind a TCP socket with the configured backlog
//! - Accept streams, applying `no_delay`
//! - Wake a pending accept when the listener is closed

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpSocket};

use crate::lifecycle::Shutdown;
use crate::net::listener::listener_closed;
use crate::net::{Address, BoxedConnection, Listener};
use crate::transport::{ListenContext, ListenError, RegistryError, TransportProtocol, TransportRegistry};

/// Register the TCP transport in `registry`.
pub fn register(registry: &TransportRegistry) -> Result<(), RegistryError> {
    registry.register(TransportProtocol::Tcp, listen)
}

/// Open a TCP listener on `address:port`.
pub async fn listen(ctx: ListenContext, address: Address, port: u16) -> Result<Box<dyn Listener>, ListenError> {
    if let Some(security) = ctx.security() {
        return Err(ListenError::UnsupportedSecurity {
            protocol: TransportProtocol::Tcp,
            security: security.security_type(),
        });
    }

    let settings = ctx.tcp().cloned().ok_or_else(|| ListenError::SettingsMismatch {
        expected: TransportProtocol::Tcp,
        actual: ctx.transport().protocol(),
    })?;

    let addr = resolve(&address, port).await?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    #[cfg(unix)]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;

    let listener = socket.listen(settings.backlog)?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        backlog = settings.backlog,
        no_delay = settings.no_delay,
        "TCP listener bound"
    );

    Ok(Box::new(TcpTransportListener {
        inner: Mutex::new(Some(Arc::new(listener))),
        closed: Shutdown::new(),
        local_addr,
        no_delay: settings.no_delay,
    }))
}

async fn resolve(address: &Address, port: u16) -> Result<SocketAddr, ListenError> {
    if let Some(addr) = address.to_socket_addr(port) {
        return Ok(addr);
    }

    let mut addrs = tokio::net::lookup_host((address.to_string(), port)).await?;
    addrs
        .next()
        .ok_or_else(|| ListenError::Resolve(address.endpoint(port).to_string()))
}

struct TcpTransportListener {
    /// Taken on close; pending accepts hold their own clone until woken.
    inner: Mutex<Option<Arc<TcpListener>>>,
    closed: Shutdown,
    local_addr: SocketAddr,
    no_delay: bool,
}

impl TcpTransportListener {
    fn current(&self) -> Option<Arc<TcpListener>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Listener for TcpTransportListener {
    async fn accept(&self) -> io::Result<BoxedConnection> {
        let listener = self.current().ok_or_else(listener_closed)?;
        let mut closed = self.closed.subscribe();

        let (stream, peer_addr) = tokio::select! {
            result = listener.accept() => result?,
            _ = closed.recv() => return Err(listener_closed()),
        };

        if self.no_delay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(peer_addr = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        tracing::trace!(peer_addr = %peer_addr, "TCP connection accepted");
        Ok(Box::new(stream))
    }

    async fn close(&self) -> io::Result<()> {
        let taken = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.closed.trigger();

        match taken {
            Some(_) => {
                tracing::debug!(address = %self.local_addr, "TCP listener closed");
                Ok(())
            }
            None => Err(listener_closed()),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }
}
