//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hub_connections_accepted_total` (counter): accepted connections by protocol
//! - `hub_accept_failures_total` (counter): exhausted accept cycles by protocol, severity
//! - `hub_active_handlers` (gauge): handler tasks in flight by protocol
//! - `hub_listeners_active` (gauge): accept loops currently running
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are static strings; no per-connection cardinality

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::hub::Severity;
use crate::transport::TransportProtocol;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_accepted(protocol: TransportProtocol) {
    counter!("hub_connections_accepted_total", "protocol" => protocol.as_str()).increment(1);
}

pub fn record_accept_failure(protocol: TransportProtocol, severity: Severity) {
    counter!(
        "hub_accept_failures_total",
        "protocol" => protocol.as_str(),
        "severity" => severity.as_str()
    )
    .increment(1);
}

pub fn handler_started(protocol: TransportProtocol) {
    gauge!("hub_active_handlers", "protocol" => protocol.as_str()).increment(1.0);
}

pub fn handler_finished(protocol: TransportProtocol) {
    gauge!("hub_active_handlers", "protocol" => protocol.as_str()).decrement(1.0);
}

pub fn listener_started() {
    gauge!("hub_listeners_active").increment(1.0);
}

pub fn listener_stopped() {
    gauge!("hub_listeners_active").decrement(1.0);
}
