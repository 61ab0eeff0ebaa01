//! Effective stream settings resolution.
//!
//! # Responsibilities
//! - Decide which protocol an inbound listens with
//! - Pick the transport settings for that protocol (explicit, then
//!   process-wide default, then built-in default)
//! - Pick the security settings matching the declared security type
//!
//! # Design Decisions
//! - Resolution errors are configuration errors: never retried
//! - Everything returned has already been validated

use thiserror::Error;

use crate::config::schema::{SecuritySettings, SecurityType, StreamConfig, TransportSettings};
use crate::transport::TransportProtocol;

/// Errors produced while resolving effective settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    /// Transport settings failed validation.
    #[error("invalid {protocol} transport settings: {reason}")]
    InvalidTransport {
        protocol: TransportProtocol,
        reason: String,
    },

    /// A security type was declared without matching settings.
    #[error("security type {0} declared but no {0} settings provided")]
    MissingSecurity(SecurityType),

    /// Security settings failed validation.
    #[error("invalid {security} security settings: {reason}")]
    InvalidSecurity {
        security: SecurityType,
        reason: String,
    },

    /// Security settings were requested but no security type is declared.
    #[error("no security type declared")]
    NoSecurity,
}

/// Settings contract consumed by the hub when binding.
pub trait StreamSettings: Send + Sync {
    /// Whether a security layer is declared.
    fn has_security_settings(&self) -> bool;

    /// Protocol to listen with.
    fn effective_protocol(&self) -> TransportProtocol;

    /// Transport settings for the effective protocol.
    fn effective_transport_settings(&self) -> Result<TransportSettings, SettingsError>;

    /// Security settings for the declared security type.
    fn effective_security_settings(&self) -> Result<SecuritySettings, SettingsError>;
}

impl StreamConfig {
    /// Fill in process-wide transport defaults for protocols this stream
    /// does not configure itself.
    pub fn with_defaults(&self, defaults: &[TransportSettings]) -> StreamConfig {
        let mut merged = self.clone();
        for default in defaults {
            let protocol = default.protocol();
            if !merged
                .transport_settings
                .iter()
                .any(|settings| settings.protocol() == protocol)
            {
                merged.transport_settings.push(default.clone());
            }
        }
        merged
    }
}

impl StreamSettings for StreamConfig {
    fn has_security_settings(&self) -> bool {
        self.security_type.is_some()
    }

    fn effective_protocol(&self) -> TransportProtocol {
        self.protocol
    }

    fn effective_transport_settings(&self) -> Result<TransportSettings, SettingsError> {
        let protocol = self.effective_protocol();
        let settings = self
            .transport_settings
            .iter()
            .find(|settings| settings.protocol() == protocol)
            .cloned()
            .unwrap_or_else(|| TransportSettings::default_for(protocol));

        settings.validate()?;
        Ok(settings)
    }

    fn effective_security_settings(&self) -> Result<SecuritySettings, SettingsError> {
        let security = self.security_type.ok_or(SettingsError::NoSecurity)?;
        let settings = self
            .security_settings
            .iter()
            .find(|settings| settings.security_type() == security)
            .cloned()
            .ok_or(SettingsError::MissingSecurity(security))?;

        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{CertificateConfig, TcpSettings, TlsSettings, WebSocketSettings};

    #[test]
    fn explicit_transport_settings_win() {
        let stream = StreamConfig {
            protocol: TransportProtocol::Tcp,
            transport_settings: vec![
                TransportSettings::WebSocket(WebSocketSettings { path: "/ws".into() }),
                TransportSettings::Tcp(TcpSettings { no_delay: false, backlog: 16 }),
            ],
            ..Default::default()
        };

        assert_eq!(
            stream.effective_transport_settings().unwrap(),
            TransportSettings::Tcp(TcpSettings { no_delay: false, backlog: 16 })
        );
    }

    #[test]
    fn falls_back_to_builtin_defaults() {
        let stream = StreamConfig {
            protocol: TransportProtocol::Mkcp,
            ..Default::default()
        };
        assert_eq!(
            stream.effective_transport_settings().unwrap(),
            TransportSettings::default_for(TransportProtocol::Mkcp)
        );
    }

    #[test]
    fn process_defaults_fill_gaps_only() {
        let stream = StreamConfig {
            protocol: TransportProtocol::WebSocket,
            transport_settings: vec![TransportSettings::Tcp(TcpSettings { no_delay: false, backlog: 8 })],
            ..Default::default()
        };
        let defaults = vec![
            TransportSettings::Tcp(TcpSettings::default()),
            TransportSettings::WebSocket(WebSocketSettings { path: "/global".into() }),
        ];

        let merged = stream.with_defaults(&defaults);
        assert_eq!(merged.transport_settings.len(), 2);
        assert_eq!(
            merged.effective_transport_settings().unwrap(),
            TransportSettings::WebSocket(WebSocketSettings { path: "/global".into() })
        );
        assert_eq!(
            merged.transport_settings[0],
            TransportSettings::Tcp(TcpSettings { no_delay: false, backlog: 8 })
        );
    }

    #[test]
    fn invalid_transport_settings_fail_resolution() {
        let stream = StreamConfig {
            protocol: TransportProtocol::WebSocket,
            transport_settings: vec![TransportSettings::WebSocket(WebSocketSettings { path: "ws".into() })],
            ..Default::default()
        };
        assert!(matches!(
            stream.effective_transport_settings(),
            Err(SettingsError::InvalidTransport { protocol: TransportProtocol::WebSocket, .. })
        ));
    }

    #[test]
    fn security_resolution() {
        let mut stream = StreamConfig::default();
        assert!(!stream.has_security_settings());
        assert_eq!(stream.effective_security_settings(), Err(SettingsError::NoSecurity));

        stream.security_type = Some(SecurityType::Tls);
        assert!(stream.has_security_settings());
        assert_eq!(
            stream.effective_security_settings(),
            Err(SettingsError::MissingSecurity(SecurityType::Tls))
        );

        let tls = SecuritySettings::Tls(TlsSettings {
            certificates: vec![CertificateConfig {
                cert_path: "cert.pem".into(),
                key_path: "key.pem".into(),
            }],
            ..Default::default()
        });
        stream.security_settings.push(tls.clone());
        assert_eq!(stream.effective_security_settings(), Ok(tls));
    }
}
