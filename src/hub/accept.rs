//! Accept loop.
//!
//! # Responsibilities
//! - Accept connections until shutdown
//! - Retry failed accepts with bounded exponential backoff
//! - Classify exhausted failures (WARN for operator attention, INFO otherwise)
//! - Dispatch each connection to the handler on its own task
//!
//! # Design Decisions
//! - A run of accept failures never stops the loop
//! - Errors caused by our own shutdown are swallowed, never logged
//! - Backoff sleeps are abandoned as soon as shutdown is signalled

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::Instrument;

use crate::hub::handler::SharedHandler;
use crate::lifecycle::Shutdown;
use crate::net::{BoxedConnection, ConnectionTracker, Listener};
use crate::observability::metrics;
use crate::resilience::{Attempt, RetryError, RetryPolicy};
use crate::transport::TransportProtocol;

/// How loudly an accept failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The listener may be unhealthy (resource exhaustion, unexpected OS error).
    ActionRequired,
    /// Routine per-connection noise (peer reset or aborted the handshake).
    Transient,
}

impl Severity {
    /// Classify an error returned by `accept`.
    pub fn classify(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut => Severity::Transient,
            _ => Severity::ActionRequired,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::ActionRequired => "action_required",
            Severity::Transient => "transient",
        }
    }

    pub fn is_action_required(&self) -> bool {
        matches!(self, Severity::ActionRequired)
    }
}

/// A failed accept, tagged with its severity.
#[derive(Debug, Error)]
#[error("failed to accept new {protocol} connection: {source}")]
pub struct AcceptError {
    pub protocol: TransportProtocol,
    pub severity: Severity,
    #[source]
    pub source: io::Error,
}

impl AcceptError {
    pub fn new(protocol: TransportProtocol, source: io::Error) -> Self {
        Self {
            protocol,
            severity: Severity::classify(&source),
            source,
        }
    }
}

/// Counters kept by every hub.
#[derive(Debug, Default)]
pub struct HubStats {
    accepted: AtomicU64,
    accept_failures: AtomicU64,
}

impl HubStats {
    /// Connections handed to the handler.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Accept cycles that exhausted every retry.
    pub fn accept_failures(&self) -> u64 {
        self.accept_failures.load(Ordering::Relaxed)
    }
}

/// State shared between a hub handle and its accept-loop task.
pub(crate) struct Shared {
    pub(crate) listener: Box<dyn Listener>,
    pub(crate) handler: SharedHandler,
    pub(crate) shutdown: Shutdown,
    pub(crate) retry: RetryPolicy,
    pub(crate) protocol: TransportProtocol,
    pub(crate) tracker: ConnectionTracker,
    pub(crate) stats: HubStats,
}

impl Shared {
    /// One accept attempt, as seen by the retry policy.
    async fn try_accept(&self) -> Attempt<BoxedConnection, AcceptError> {
        if self.shutdown.is_triggered() {
            return Attempt::Skip;
        }

        match self.listener.accept().await {
            Ok(conn) => Attempt::Ready(conn),
            // Closing the listener wakes a pending accept with an error.
            Err(_) if self.shutdown.is_triggered() => Attempt::Skip,
            Err(source) => Attempt::Retry(AcceptError::new(self.protocol, source)),
        }
    }

    fn dispatch(&self, conn: BoxedConnection) {
        let ticket = self.tracker.begin();
        let peer_addr = conn.peer_addr().ok();
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        metrics::record_accepted(self.protocol);

        let span = tracing::info_span!(
            "connection",
            connection_id = %ticket.id(),
            peer_addr = ?peer_addr,
        );
        tracing::debug!(parent: &span, "Dispatching connection");

        let handler = Arc::clone(&self.handler);
        let gauge = HandlerGauge::start(self.protocol);
        tokio::spawn(
            async move {
                let _ticket = ticket;
                let _gauge = gauge;
                handler.handle(conn).await;
            }
            .instrument(span),
        );
    }

    fn report(&self, exhausted: RetryError<AcceptError>) {
        self.stats.accept_failures.fetch_add(1, Ordering::Relaxed);
        let attempts = exhausted.attempts;
        let error = exhausted.into_last();
        metrics::record_accept_failure(self.protocol, error.severity);

        if error.severity.is_action_required() {
            tracing::warn!(attempts, error = %error, "Accept failed after retries");
        } else {
            tracing::info!(attempts, error = %error, "Accept failed after retries");
        }
    }
}

/// Keeps `hub_active_handlers` honest even if a handler panics.
struct HandlerGauge(TransportProtocol);

impl HandlerGauge {
    fn start(protocol: TransportProtocol) -> Self {
        metrics::handler_started(protocol);
        Self(protocol)
    }
}

impl Drop for HandlerGauge {
    fn drop(&mut self) {
        metrics::handler_finished(self.0);
    }
}

/// Accept until shutdown. Runs as the hub's dedicated task.
pub(crate) async fn run(shared: Arc<Shared>) {
    let mut shutdown = shared.shutdown.subscribe();
    metrics::listener_started();
    tracing::debug!("Accept loop started");

    loop {
        if shared.shutdown.is_triggered() {
            break;
        }

        let outcome = tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            outcome = shared.retry.run(|| shared.try_accept()) => outcome,
        };

        match outcome {
            Ok(Some(conn)) => shared.dispatch(conn),
            Ok(None) => {}
            Err(exhausted) => shared.report(exhausted),
        }
    }

    metrics::listener_stopped();
    tracing::debug!("Accept loop stopped");
}
