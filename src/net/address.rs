//! Listen addresses.
//!
//! Transports bind to either a literal IP or a domain name that they resolve
//! themselves. `Endpoint` renders an `address:port` pair for logs and errors.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// Address a transport is asked to listen on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Literal IPv4 or IPv6 address.
    Ip(IpAddr),
    /// Domain name, resolved by the transport at bind time.
    Domain(String),
}

impl Address {
    /// The IPv4 wildcard address (`0.0.0.0`).
    pub fn any() -> Self {
        Address::Ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// Pair this address with a port for display.
    pub fn endpoint(&self, port: u16) -> Endpoint<'_> {
        Endpoint { address: self, port }
    }

    /// Convert to a socket address when the address is a literal IP.
    pub fn to_socket_addr(&self, port: u16) -> Option<SocketAddr> {
        match self {
            Address::Ip(ip) => Some(SocketAddr::new(*ip, port)),
            Address::Domain(_) => None,
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Address::Ip(ip)
    }
}

/// Error returned when a string is neither an IP nor a plausible domain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid listen address: {0:?}")]
pub struct AddressParseError(pub String);

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Accept bracketed IPv6 as written in `[::1]:port` style configs.
        let unbracketed = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);

        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(Address::Ip(ip));
        }

        let valid_domain = !trimmed.is_empty()
            && trimmed.len() <= 253
            && trimmed
                .split('.')
                .all(|label| {
                    !label.is_empty()
                        && label.len() <= 63
                        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                        && !label.starts_with('-')
                        && !label.ends_with('-')
                });

        if valid_domain {
            Ok(Address::Domain(trimmed.to_ascii_lowercase()))
        } else {
            Err(AddressParseError(s.to_string()))
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ip(ip) => write!(f, "{}", ip),
            Address::Domain(domain) => f.write_str(domain),
        }
    }
}

/// Display helper for `address:port`, bracketing IPv6 literals.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    address: &'a Address,
    port: u16,
}

impl fmt::Display for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Address::Ip(IpAddr::V6(ip)) => write!(f, "[{}]:{}", ip, self.port),
            other => write!(f, "{}:{}", other, self.port),
        }
    }
}
