//! Listener hub.
//!
//! # Data Flow
//! ```text
//! bind(address, port, handler, stream settings)
//!     → resolve protocol, transport settings, security settings
//!     → registry lookup → listen function → Box<dyn Listener>
//!     → ListenerHub (spawns accept.rs loop)
//!     → one task per accepted connection → handler
//!
//! close()
//!     → shutdown signal (set once) → listener.close() → loop exits
//! ```
//!
//! # Design Decisions
//! - Bind errors surface synchronously; nothing is retried at bind time
//! - The hub is the only owner of its listener
//! - close() is idempotent; one caller closes, the rest return at once

pub mod accept;
pub mod handler;

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::{SettingsError, StreamSettings};
use crate::lifecycle::Shutdown;
use crate::net::{Address, ConnectionTracker, Listener};
use crate::resilience::RetryPolicy;
use crate::transport::{ListenContext, ListenError, TransportProtocol, TransportRegistry};

pub use accept::{AcceptError, HubStats, Severity};
pub use handler::{handler_fn, ConnectionHandler, SharedHandler};

use accept::Shared;

/// Errors returned by [`ListenerHub::bind`].
#[derive(Debug, Error)]
pub enum HubError {
    /// Effective settings could not be resolved.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// No transport registered for the protocol.
    #[error("{0} listener not registered")]
    Unregistered(TransportProtocol),

    /// The transport failed to open its listener.
    #[error("failed to listen on {target}: {source}")]
    Listen {
        target: String,
        #[source]
        source: ListenError,
    },
}

/// Binds hubs against a specific registry and retry policy.
#[derive(Debug, Clone)]
pub struct Binder<'r> {
    registry: &'r TransportRegistry,
    retry: RetryPolicy,
}

impl<'r> Binder<'r> {
    /// Binder using `registry` and the default accept retry policy.
    pub fn new(registry: &'r TransportRegistry) -> Self {
        Self {
            registry,
            retry: RetryPolicy::accept(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Open a listener for `settings` on `address:port` and start accepting.
    ///
    /// Returns as soon as the listener is bound; accepting happens on a
    /// separate task.
    pub async fn bind(
        &self,
        address: &Address,
        port: u16,
        handler: SharedHandler,
        settings: &dyn StreamSettings,
    ) -> Result<ListenerHub, HubError> {
        let protocol = settings.effective_protocol();
        let transport = settings.effective_transport_settings()?;

        let mut ctx = ListenContext::new(transport);
        if settings.has_security_settings() {
            ctx = ctx.with_security(settings.effective_security_settings()?);
        }

        let listen = self
            .registry
            .lookup(protocol)
            .ok_or(HubError::Unregistered(protocol))?;

        let target = address.endpoint(port).to_string();
        let listener = listen(ctx, address.clone(), port)
            .await
            .map_err(|source| HubError::Listen {
                target: target.clone(),
                source,
            })?;

        let bound = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or(target);
        tracing::info!(protocol = %protocol, address = %bound, "Listener hub started");

        Ok(ListenerHub::start(listener, handler, protocol, self.retry, bound))
    }
}

/// Owns one listener and the task accepting on it.
pub struct ListenerHub {
    shared: Arc<Shared>,
    address: String,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ListenerHub {
    /// Bind using the process-wide registry and the default retry policy.
    pub async fn bind(
        address: &Address,
        port: u16,
        handler: SharedHandler,
        settings: &dyn StreamSettings,
    ) -> Result<Self, HubError> {
        Binder::new(TransportRegistry::global())
            .bind(address, port, handler, settings)
            .await
    }

    fn start(
        listener: Box<dyn Listener>,
        handler: SharedHandler,
        protocol: TransportProtocol,
        retry: RetryPolicy,
        address: String,
    ) -> Self {
        let shared = Arc::new(Shared {
            listener,
            handler,
            shutdown: Shutdown::new(),
            retry,
            protocol,
            tracker: ConnectionTracker::new(),
            stats: HubStats::default(),
        });

        let span = tracing::info_span!("listener", protocol = %protocol, address = %address);
        let accept_task = tokio::spawn(accept::run(Arc::clone(&shared)).instrument(span));

        Self {
            shared,
            address,
            accept_task: Mutex::new(Some(accept_task)),
        }
    }

    /// Stop accepting and close the listener.
    ///
    /// Idempotent and safe to call concurrently; only the first call has any
    /// effect. Errors from closing the listener are logged, not returned.
    pub async fn close(&self) {
        if !self.shared.shutdown.trigger() {
            return;
        }

        if let Err(e) = self.shared.listener.close().await {
            tracing::debug!(address = %self.address, error = %e, "Error closing listener");
        }
        tracing::info!(
            protocol = %self.shared.protocol,
            address = %self.address,
            "Listener hub closed"
        );
    }

    /// Wait for the accept loop to finish. Returns immediately if another
    /// caller already joined it.
    pub async fn join(&self) {
        let handle = self
            .accept_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(address = %self.address, error = %e, "Accept loop ended abnormally");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_triggered()
    }

    pub fn protocol(&self) -> TransportProtocol {
        self.shared.protocol
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.shared.listener.local_addr()
    }

    pub fn stats(&self) -> &HubStats {
        &self.shared.stats
    }

    /// Handler tasks that have not finished yet.
    pub fn active_connections(&self) -> u64 {
        self.shared.tracker.in_flight()
    }
}

impl std::fmt::Debug for ListenerHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHub")
            .field("protocol", &self.shared.protocol)
            .field("address", &self.address)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for ListenerHub {
    /// A dropped hub stops its accept loop; the listener is released when
    /// the loop lets go of it.
    fn drop(&mut self) {
        self.shared.shutdown.trigger();
    }
}
