//! Shared utilities for hub integration tests.

#![allow(dead_code)]

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::{mpsc, watch};
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{self, Layer, SubscriberExt};

use transport_hub::config::{SecuritySettings, SecurityType, SettingsError, StreamSettings, TransportSettings};
use transport_hub::lifecycle::Shutdown;
use transport_hub::net::listener::listener_closed;
use transport_hub::net::{BoxedConnection, Connection, Listener};
use transport_hub::transport::{ListenError, TransportProtocol, TransportRegistry};

/// In-memory connection backed by a tokio duplex pipe.
pub struct MemoryConnection {
    stream: DuplexStream,
    peer: SocketAddr,
}

impl AsyncRead for MemoryConnection {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryConnection {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

impl Connection for MemoryConnection {
    fn peer_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.peer)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 0)))
    }
}

/// A connection for the hub plus the client end of its pipe.
pub fn memory_connection(peer_port: u16) -> (BoxedConnection, DuplexStream) {
    let (server, client) = tokio::io::duplex(1024);
    let conn = MemoryConnection {
        stream: server,
        peer: SocketAddr::from(([10, 0, 0, 1], peer_port)),
    };
    (Box::new(conn), client)
}

/// Test-side view of a scripted listener: feeds accept results and
/// observes how the hub drives it.
pub struct Probe {
    tx: mpsc::UnboundedSender<io::Result<BoxedConnection>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<io::Result<BoxedConnection>>>>,
    accepts: watch::Sender<usize>,
    closes: AtomicUsize,
    listens: AtomicUsize,
    security: Mutex<Option<SecuritySettings>>,
}

impl Probe {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (accepts, _) = watch::channel(0);
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            accepts,
            closes: AtomicUsize::new(0),
            listens: AtomicUsize::new(0),
            security: Mutex::new(None),
        }
    }

    /// Queue a connection for the next accept call.
    pub fn push_connection(&self, conn: BoxedConnection) {
        self.tx.send(Ok(conn)).unwrap();
    }

    /// Queue an error for the next accept call.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.tx.send(Err(io::Error::new(kind, "scripted accept failure"))).unwrap();
    }

    pub fn accept_calls(&self) -> usize {
        *self.accepts.borrow()
    }

    pub fn close_calls(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn listen_calls(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }

    /// Security settings the listener was opened with.
    pub fn security(&self) -> Option<SecuritySettings> {
        self.security.lock().unwrap().clone()
    }

    /// Wait until the listener has seen at least `n` accept calls.
    pub async fn wait_for_accepts(&self, n: usize) {
        let mut rx = self.accepts.subscribe();
        let reached = tokio::time::timeout(Duration::from_secs(3600), rx.wait_for(|calls| *calls >= n))
            .await
            .is_ok();
        assert!(reached, "listener never reached {n} accept calls");
    }
}

/// Listener whose accept results are scripted through a [`Probe`].
///
/// Accept waits when nothing is queued and fails once the listener is
/// closed.
pub struct ScriptedListener {
    probe: Arc<Probe>,
    queue: tokio::sync::Mutex<mpsc::UnboundedReceiver<io::Result<BoxedConnection>>>,
    closed: Shutdown,
}

#[async_trait]
impl Listener for ScriptedListener {
    async fn accept(&self) -> io::Result<BoxedConnection> {
        self.probe.accepts.send_modify(|calls| *calls += 1);
        let mut closed = self.closed.subscribe();
        let mut queue = self.queue.lock().await;

        tokio::select! {
            _ = closed.recv() => Err(listener_closed()),
            next = queue.recv() => match next {
                Some(result) => result,
                None => Err(listener_closed()),
            },
        }
    }

    async fn close(&self) -> io::Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.trigger();
        Ok(())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(SocketAddr::from(([127, 0, 0, 1], 7000)))
    }
}

/// Register a scripted listener for `protocol` in `registry`.
pub fn register_scripted(registry: &TransportRegistry, protocol: TransportProtocol) -> Arc<Probe> {
    let probe = Arc::new(Probe::new());
    let factory_probe = Arc::clone(&probe);

    registry
        .register(protocol, move |ctx, _address, _port| {
            let probe = Arc::clone(&factory_probe);
            async move {
                probe.listens.fetch_add(1, Ordering::SeqCst);
                *probe.security.lock().unwrap() = ctx.security().cloned();
                let queue = probe
                    .rx
                    .lock()
                    .unwrap()
                    .take()
                    .expect("scripted listener opened twice");
                let listener = ScriptedListener {
                    probe,
                    queue: tokio::sync::Mutex::new(queue),
                    closed: Shutdown::new(),
                };
                Ok::<Box<dyn Listener>, ListenError>(Box::new(listener))
            }
        })
        .unwrap();

    probe
}

/// Stream settings with a fixed protocol and default transport settings.
pub struct FixedSettings(pub TransportProtocol);

impl StreamSettings for FixedSettings {
    fn has_security_settings(&self) -> bool {
        false
    }

    fn effective_protocol(&self) -> TransportProtocol {
        self.0
    }

    fn effective_transport_settings(&self) -> Result<TransportSettings, SettingsError> {
        Ok(TransportSettings::default_for(self.0))
    }

    fn effective_security_settings(&self) -> Result<SecuritySettings, SettingsError> {
        Err(SettingsError::NoSecurity)
    }
}

/// Stream settings whose transport settings never resolve.
pub struct BrokenSettings(pub TransportProtocol);

impl StreamSettings for BrokenSettings {
    fn has_security_settings(&self) -> bool {
        false
    }

    fn effective_protocol(&self) -> TransportProtocol {
        self.0
    }

    fn effective_transport_settings(&self) -> Result<TransportSettings, SettingsError> {
        Err(SettingsError::InvalidTransport {
            protocol: self.0,
            reason: "broken on purpose".into(),
        })
    }

    fn effective_security_settings(&self) -> Result<SecuritySettings, SettingsError> {
        Err(SettingsError::NoSecurity)
    }
}

/// Stream settings that declare a security layer.
///
/// `security` of `None` models a declared type with no matching settings.
pub struct SecuredSettings {
    pub protocol: TransportProtocol,
    pub security: Option<SecuritySettings>,
}

impl StreamSettings for SecuredSettings {
    fn has_security_settings(&self) -> bool {
        true
    }

    fn effective_protocol(&self) -> TransportProtocol {
        self.protocol
    }

    fn effective_transport_settings(&self) -> Result<TransportSettings, SettingsError> {
        Ok(TransportSettings::default_for(self.protocol))
    }

    fn effective_security_settings(&self) -> Result<SecuritySettings, SettingsError> {
        self.security
            .clone()
            .ok_or(SettingsError::MissingSecurity(SecurityType::Tls))
    }
}

/// Records the level and message of every event emitted while installed.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// Install as the default subscriber for the current thread.
    ///
    /// Tasks spawned on a current-thread runtime are polled on this thread,
    /// so their events are captured too.
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Messages logged at exactly `level`.
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(event_level, _)| *event_level == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Events logged with `message`, at any level.
    pub fn levels_of(&self, message: &str) -> Vec<Level> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, logged)| logged == message)
            .map(|(level, _)| *level)
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
        let mut message = MessageField::default();
        event.record(&mut message);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

#[derive(Default)]
struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
