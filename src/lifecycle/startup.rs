//! Startup and teardown of configured inbounds.
//!
//! # Responsibilities
//! - Bind every configured inbound, in config order
//! - Apply process-wide transport defaults and the accept retry policy
//! - Close everything again on the way out
//!
//! # Design Decisions
//! - Fail fast: the first inbound that cannot start aborts startup and
//!   closes the inbounds already running
//! - Transports must be registered before this runs

use thiserror::Error;

use crate::config::{HubConfig, InboundConfig};
use crate::hub::{Binder, HubError, ListenerHub, SharedHandler};
use crate::net::address::{Address, AddressParseError};
use crate::resilience::RetryPolicy;
use crate::transport::TransportRegistry;

/// Why an inbound failed to start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("inbound {tag:?}: {source}")]
    Address {
        tag: String,
        #[source]
        source: AddressParseError,
    },

    #[error("inbound {tag:?}: {source}")]
    Inbound {
        tag: String,
        #[source]
        source: HubError,
    },
}

/// A started inbound.
#[derive(Debug)]
pub struct RunningInbound {
    pub tag: String,
    pub hub: ListenerHub,
}

/// Bind every inbound in `config` against `registry`.
pub async fn start_inbounds(
    config: &HubConfig,
    registry: &TransportRegistry,
    handler: SharedHandler,
) -> Result<Vec<RunningInbound>, StartupError> {
    let binder = Binder::new(registry).with_retry(RetryPolicy::from(&config.accept_retry));
    let mut running: Vec<RunningInbound> = Vec::with_capacity(config.inbounds.len());

    for inbound in &config.inbounds {
        let started = start_one(&binder, config, inbound, handler.clone()).await;

        match started {
            Ok(hub) => {
                tracing::info!(tag = %inbound.tag, protocol = %hub.protocol(), "Inbound started");
                running.push(RunningInbound {
                    tag: inbound.tag.clone(),
                    hub,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Inbound failed to start, rolling back");
                stop_inbounds(&running).await;
                return Err(e);
            }
        }
    }

    Ok(running)
}

async fn start_one(
    binder: &Binder<'_>,
    config: &HubConfig,
    inbound: &InboundConfig,
    handler: SharedHandler,
) -> Result<ListenerHub, StartupError> {
    let address: Address = inbound.listen.parse().map_err(|source| StartupError::Address {
        tag: inbound.tag.clone(),
        source,
    })?;
    let stream = inbound.stream_settings.with_defaults(&config.transport);

    binder
        .bind(&address, inbound.port, handler, &stream)
        .await
        .map_err(|source| StartupError::Inbound {
            tag: inbound.tag.clone(),
            source,
        })
}

/// Close every inbound, then wait for their accept loops to exit.
pub async fn stop_inbounds(inbounds: &[RunningInbound]) {
    for inbound in inbounds {
        inbound.hub.close().await;
    }
    for inbound in inbounds {
        inbound.hub.join().await;
        tracing::debug!(tag = %inbound.tag, "Inbound stopped");
    }
}
