//! Settings handed to a transport's listen function.

use crate::config::{SecuritySettings, TcpSettings, TransportSettings};

/// Per-bind settings passed by value into a [`ListenFunc`].
///
/// Built once by the hub from the resolved stream settings.
///
/// [`ListenFunc`]: crate::transport::ListenFunc
#[derive(Debug, Clone, PartialEq)]
pub struct ListenContext {
    transport: TransportSettings,
    security: Option<SecuritySettings>,
}

impl ListenContext {
    pub fn new(transport: TransportSettings) -> Self {
        Self {
            transport,
            security: None,
        }
    }

    /// Attach resolved security settings.
    pub fn with_security(mut self, security: SecuritySettings) -> Self {
        self.security = Some(security);
        self
    }

    pub fn transport(&self) -> &TransportSettings {
        &self.transport
    }

    pub fn security(&self) -> Option<&SecuritySettings> {
        self.security.as_ref()
    }

    /// TCP settings, if the transport settings are for TCP.
    pub fn tcp(&self) -> Option<&TcpSettings> {
        match &self.transport {
            TransportSettings::Tcp(tcp) => Some(tcp),
            _ => None,
        }
    }
}
