//! Transport protocol identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wire-level transport kind, used as the key into the transport registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    /// Plain stream sockets.
    #[default]
    Tcp,
    /// KCP over UDP.
    Mkcp,
    /// WebSocket upgrade over TCP.
    #[serde(rename = "websocket")]
    WebSocket,
}

impl TransportProtocol {
    /// Stable lowercase name, as used in config files and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Mkcp => "mkcp",
            Self::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_metric_labels() {
        assert_eq!(TransportProtocol::WebSocket.to_string(), "websocket");
        assert_eq!(TransportProtocol::default(), TransportProtocol::Tcp);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            protocol: TransportProtocol,
        }
        let parsed: Wrapper = toml::from_str("protocol = \"websocket\"").unwrap();
        assert_eq!(parsed.protocol, TransportProtocol::WebSocket);
    }
}
