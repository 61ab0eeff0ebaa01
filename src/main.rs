//! Transport listener hub.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                  TRANSPORT HUB                   │
//!                    │                                                  │
//!   config.toml ─────┼─▶ config ──▶ lifecycle::startup                  │
//!                    │                  │                               │
//!                    │                  ▼                               │
//!                    │   transport::registry ──▶ listen function        │
//!                    │                  │                               │
//!                    │                  ▼                               │
//!   Client ──────────┼─▶ net::Listener ──▶ hub::accept ──▶ handler      │
//!                    │                      │                           │
//!                    │                      ▼                           │
//!                    │              resilience::retries                 │
//!                    │                                                  │
//!                    │  ┌────────────────────────────────────────────┐  │
//!                    │  │          Cross-Cutting Concerns            │  │
//!                    │  │   observability (logs, metrics)            │  │
//!                    │  │   lifecycle (signals, shutdown)            │  │
//!                    │  └────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! The binary serves every configured inbound with an echo handler, which
//! is enough to exercise transports end to end.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::AsyncWriteExt;

use transport_hub::config::loader::load_config;
use transport_hub::lifecycle::signals::wait_for_signal;
use transport_hub::lifecycle::{start_inbounds, stop_inbounds};
use transport_hub::net::BoxedConnection;
use transport_hub::observability::{logging, metrics};
use transport_hub::{handler_fn, transport, TransportRegistry};

#[derive(Parser, Debug)]
#[command(author, version, about = "Transport listener hub")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "transport-hub.toml")]
    config: PathBuf,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    if args.check {
        println!("{}: OK ({} inbounds)", args.config.display(), config.inbounds.len());
        return Ok(());
    }

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "transport-hub starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    transport::register_builtin();

    let inbounds = start_inbounds(&config, TransportRegistry::global(), handler_fn(echo)).await?;
    tracing::info!(inbounds = inbounds.len(), "Configuration loaded, accepting connections");

    let signal = wait_for_signal().await?;
    tracing::info!(signal, "Shutdown signal received");

    stop_inbounds(&inbounds).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn echo(conn: BoxedConnection) {
    let peer = conn.peer_addr().ok();
    let (mut reader, mut writer) = tokio::io::split(conn);

    match tokio::io::copy(&mut reader, &mut writer).await {
        Ok(bytes) => tracing::debug!(peer = ?peer, bytes, "Echo finished"),
        Err(e) => tracing::debug!(peer = ?peer, error = %e, "Echo aborted"),
    }
    if let Err(e) = writer.shutdown().await {
        tracing::debug!(peer = ?peer, error = %e, "Echo shutdown failed");
    }
}
