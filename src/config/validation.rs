//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve every inbound's effective stream settings up front
//! - Validate value ranges for the accept retry policy
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HubConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{HubConfig, RetryConfig};
use crate::config::stream::{SettingsError, StreamSettings};
use crate::net::address::{Address, AddressParseError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("inbound #{0} has an empty tag")]
    EmptyTag(usize),

    #[error("duplicate inbound tag {0:?}")]
    DuplicateTag(String),

    #[error("inbound {tag:?}: {source}")]
    Address {
        tag: String,
        source: AddressParseError,
    },

    #[error("inbound {tag:?}: {source}")]
    Stream { tag: String, source: SettingsError },

    #[error("transport defaults: {0}")]
    TransportDefault(SettingsError),

    #[error("transport defaults: more than one entry for {0}")]
    DuplicateTransportDefault(crate::transport::TransportProtocol),

    #[error("accept_retry: {0}")]
    Retry(String),

    #[error("observability: invalid metrics_address {0:?}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &HubConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen_defaults = HashSet::new();
    for default in &config.transport {
        if !seen_defaults.insert(default.protocol()) {
            errors.push(ValidationError::DuplicateTransportDefault(default.protocol()));
        }
        if let Err(e) = default.validate() {
            errors.push(ValidationError::TransportDefault(e));
        }
    }

    let mut seen_tags = HashSet::new();
    for (index, inbound) in config.inbounds.iter().enumerate() {
        if inbound.tag.trim().is_empty() {
            errors.push(ValidationError::EmptyTag(index));
        } else if !seen_tags.insert(inbound.tag.as_str()) {
            errors.push(ValidationError::DuplicateTag(inbound.tag.clone()));
        }

        if let Err(source) = inbound.listen.parse::<Address>() {
            errors.push(ValidationError::Address {
                tag: inbound.tag.clone(),
                source,
            });
        }

        let stream = inbound.stream_settings.with_defaults(&config.transport);
        let resolved = stream.effective_transport_settings().and_then(|_| {
            if stream.has_security_settings() {
                stream.effective_security_settings().map(drop)
            } else {
                Ok(())
            }
        });
        if let Err(source) = resolved {
            errors.push(ValidationError::Stream {
                tag: inbound.tag.clone(),
                source,
            });
        }
    }

    validate_retry(&config.accept_retry, &mut errors);

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if retry.max_attempts == 0 {
        errors.push(ValidationError::Retry("max_attempts must be at least 1".into()));
    }
    if retry.base_delay_ms == 0 {
        errors.push(ValidationError::Retry("base_delay_ms must be greater than 0".into()));
    }
    // Jitter adds up to 10%, which must not undo the growth between delays.
    let min_multiplier = if retry.jitter { 1.1 } else { 1.0 };
    if !(retry.multiplier.is_finite() && retry.multiplier > min_multiplier) {
        errors.push(ValidationError::Retry(format!(
            "multiplier must be greater than {}",
            min_multiplier
        )));
    }
    if let Some(max) = retry.max_delay_ms {
        if max < retry.base_delay_ms {
            errors.push(ValidationError::Retry(
                "max_delay_ms must not be below base_delay_ms".into(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{
        InboundConfig, SecurityType, StreamConfig, TcpSettings, TransportSettings,
    };
    use crate::transport::TransportProtocol;

    fn inbound(tag: &str, listen: &str) -> InboundConfig {
        InboundConfig {
            tag: tag.to_string(),
            listen: listen.to_string(),
            port: 1080,
            stream_settings: StreamConfig::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&HubConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = HubConfig::default();
        config.inbounds.push(inbound("a", "0.0.0.0"));
        config.inbounds.push(inbound("a", "not an address"));
        config.inbounds.push(inbound(" ", "127.0.0.1"));
        config.accept_retry.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateTag("a".into())));
        assert!(errors.contains(&ValidationError::EmptyTag(2)));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::Address { tag, .. } if tag == "a")));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Retry(_))));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn rejects_unresolvable_stream_settings() {
        let mut config = HubConfig::default();
        let mut tls = inbound("tls", "0.0.0.0");
        tls.stream_settings.security_type = Some(SecurityType::Tls);
        config.inbounds.push(tls);

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::Stream {
                tag: "tls".into(),
                source: SettingsError::MissingSecurity(SecurityType::Tls),
            }]
        );
    }

    #[test]
    fn invalid_defaults_are_reported() {
        let mut config = HubConfig::default();
        config.transport.push(TransportSettings::Tcp(TcpSettings { no_delay: true, backlog: 0 }));
        config.transport.push(TransportSettings::default_for(TransportProtocol::Tcp));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateTransportDefault(TransportProtocol::Tcp)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TransportDefault(_))));
    }

    #[test]
    fn retry_multiplier_must_outgrow_jitter() {
        let mut config = HubConfig::default();
        config.accept_retry.jitter = true;
        config.accept_retry.multiplier = 1.05;
        assert!(validate_config(&config).is_err());

        config.accept_retry.multiplier = 2.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = HubConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("nowhere".into())])
        );
    }
}
