//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the hub.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::stream::SettingsError;
use crate::transport::TransportProtocol;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// Inbound listeners to start.
    pub inbounds: Vec<InboundConfig>,

    /// Process-wide transport defaults, used when a stream has no entry
    /// for its protocol.
    pub transport: Vec<TransportSettings>,

    /// Retry policy for accept failures.
    pub accept_retry: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// One listening endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InboundConfig {
    /// Identifier for logs and errors.
    pub tag: String,

    /// Listen address: IP literal or domain name.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port.
    pub port: u16,

    /// Transport and security settings for this inbound.
    #[serde(default)]
    pub stream_settings: StreamConfig,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

/// Which transport to listen with, and how.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Transport protocol (default: tcp).
    pub protocol: TransportProtocol,

    /// Per-protocol transport settings. The entry matching `protocol` wins.
    pub transport_settings: Vec<TransportSettings>,

    /// Security layer to apply, if any.
    pub security_type: Option<SecurityType>,

    /// Security settings; the entry matching `security_type` wins.
    pub security_settings: Vec<SecuritySettings>,
}

/// Transport settings, tagged by protocol.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum TransportSettings {
    Tcp(TcpSettings),
    Mkcp(MkcpSettings),
    #[serde(rename = "websocket")]
    WebSocket(WebSocketSettings),
}

impl TransportSettings {
    /// Built-in defaults for `protocol`.
    pub fn default_for(protocol: TransportProtocol) -> Self {
        match protocol {
            TransportProtocol::Tcp => Self::Tcp(TcpSettings::default()),
            TransportProtocol::Mkcp => Self::Mkcp(MkcpSettings::default()),
            TransportProtocol::WebSocket => Self::WebSocket(WebSocketSettings::default()),
        }
    }

    /// Protocol these settings apply to.
    pub fn protocol(&self) -> TransportProtocol {
        match self {
            Self::Tcp(_) => TransportProtocol::Tcp,
            Self::Mkcp(_) => TransportProtocol::Mkcp,
            Self::WebSocket(_) => TransportProtocol::WebSocket,
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |reason: String| SettingsError::InvalidTransport {
            protocol: self.protocol(),
            reason,
        };

        match self {
            Self::Tcp(tcp) => {
                if tcp.backlog == 0 {
                    return Err(invalid("backlog must be greater than 0".into()));
                }
            }
            Self::Mkcp(kcp) => {
                if !(576..=1460).contains(&kcp.mtu) {
                    return Err(invalid(format!("mtu {} outside 576..=1460", kcp.mtu)));
                }
                if !(10..=100).contains(&kcp.tti) {
                    return Err(invalid(format!("tti {} outside 10..=100", kcp.tti)));
                }
            }
            Self::WebSocket(ws) => {
                if !ws.path.starts_with('/') {
                    return Err(invalid(format!("path {:?} must start with '/'", ws.path)));
                }
            }
        }
        Ok(())
    }
}

/// Plain TCP settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TcpSettings {
    /// Disable Nagle's algorithm on accepted streams.
    pub no_delay: bool,

    /// Listen backlog passed to the OS.
    pub backlog: u32,
}

impl Default for TcpSettings {
    fn default() -> Self {
        Self {
            no_delay: true,
            backlog: 1024,
        }
    }
}

/// mKCP settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MkcpSettings {
    pub mtu: u32,
    /// Transmission interval in milliseconds.
    pub tti: u32,
    /// MB/s.
    pub uplink_capacity: u32,
    /// MB/s.
    pub downlink_capacity: u32,
    pub congestion: bool,
}

impl Default for MkcpSettings {
    fn default() -> Self {
        Self {
            mtu: 1350,
            tti: 50,
            uplink_capacity: 5,
            downlink_capacity: 20,
            congestion: false,
        }
    }
}

/// WebSocket settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WebSocketSettings {
    /// Upgrade path (e.g., "/tunnel").
    pub path: String,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self { path: "/".to_string() }
    }
}

/// Security layer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityType {
    Tls,
}

impl std::fmt::Display for SecurityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityType::Tls => f.write_str("tls"),
        }
    }
}

/// Security settings, tagged by type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecuritySettings {
    Tls(TlsSettings),
}

impl SecuritySettings {
    pub fn security_type(&self) -> SecurityType {
        match self {
            SecuritySettings::Tls(_) => SecurityType::Tls,
        }
    }

    /// Check that the settings are usable on a listening side.
    pub fn validate(&self) -> Result<(), SettingsError> {
        match self {
            SecuritySettings::Tls(tls) => {
                if tls.certificates.is_empty() {
                    return Err(SettingsError::InvalidSecurity {
                        security: SecurityType::Tls,
                        reason: "at least one certificate is required".into(),
                    });
                }
                let blank = tls.certificates.iter().any(|cert| {
                    cert.cert_path.as_os_str().is_empty() || cert.key_path.as_os_str().is_empty()
                });
                if blank {
                    return Err(SettingsError::InvalidSecurity {
                        security: SecurityType::Tls,
                        reason: "certificate and key paths must not be empty".into(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// TLS settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct TlsSettings {
    /// Expected SNI, if any.
    pub server_name: Option<String>,

    /// Certificate/key pairs (PEM).
    pub certificates: Vec<CertificateConfig>,

    /// ALPN protocols to advertise.
    pub alpn: Vec<String>,

    pub allow_insecure: bool,
}

/// A certificate and its private key.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CertificateConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Retry configuration for the accept loop.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per accept cycle.
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in milliseconds.
    pub base_delay_ms: u64,

    /// Growth factor between consecutive delays.
    pub multiplier: f64,

    /// Optional upper bound for a single delay, in milliseconds.
    pub max_delay_ms: Option<u64>,

    /// Add 0-10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: None,
            jitter: false,
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
