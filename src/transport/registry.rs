//! Protocol listener registry.
//!
//! # Responsibilities
//! - Map each transport protocol to the function that opens its listener
//! - Refuse a second registration for the same protocol
//!
//! # Design Decisions
//! - Transports register during startup, before any bind; lookups follow
//! - Entries are never removed
//! - Check-and-insert happens under one shard lock (DashMap entry API)

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::SecurityType;
use crate::net::{Address, Listener};
use crate::transport::{ListenContext, TransportProtocol};

/// Errors a transport may return while opening a listener.
#[derive(Debug, Error)]
pub enum ListenError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The transport cannot apply the requested security layer.
    #[error("{protocol} transport does not support {security} security")]
    UnsupportedSecurity {
        protocol: TransportProtocol,
        security: SecurityType,
    },

    /// The transport was handed settings for another protocol.
    #[error("{expected} transport received {actual} settings")]
    SettingsMismatch {
        expected: TransportProtocol,
        actual: TransportProtocol,
    },

    /// A domain listen address resolved to nothing.
    #[error("could not resolve {0}")]
    Resolve(String),
}

/// Errors returned by [`TransportRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0} listener already registered")]
    Duplicate(TransportProtocol),
}

/// Future returned by a listen function.
pub type ListenFuture = BoxFuture<'static, Result<Box<dyn Listener>, ListenError>>;

/// Opens a listener for one protocol on `address:port`.
pub type ListenFunc = Arc<dyn Fn(ListenContext, Address, u16) -> ListenFuture + Send + Sync>;

/// Mapping from transport protocol to its listen function.
#[derive(Default)]
pub struct TransportRegistry {
    listeners: DashMap<TransportProtocol, ListenFunc>,
}

impl TransportRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`ListenerHub::bind`].
    ///
    /// [`ListenerHub::bind`]: crate::hub::ListenerHub::bind
    pub fn global() -> &'static TransportRegistry {
        static GLOBAL: OnceLock<TransportRegistry> = OnceLock::new();
        GLOBAL.get_or_init(TransportRegistry::new)
    }

    /// Register the listen function for `protocol`.
    ///
    /// Fails without touching the existing entry if `protocol` is taken.
    pub fn register<F, Fut>(&self, protocol: TransportProtocol, listen: F) -> Result<(), RegistryError>
    where
        F: Fn(ListenContext, Address, u16) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Box<dyn Listener>, ListenError>> + Send + 'static,
    {
        match self.listeners.entry(protocol) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate(protocol)),
            Entry::Vacant(slot) => {
                let listen: ListenFunc = Arc::new(move |ctx, address, port| Box::pin(listen(ctx, address, port)));
                slot.insert(listen);
                tracing::debug!(protocol = %protocol, "Transport listener registered");
                Ok(())
            }
        }
    }

    /// Listen function for `protocol`, if registered.
    pub fn lookup(&self, protocol: TransportProtocol) -> Option<ListenFunc> {
        self.listeners.get(&protocol).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, protocol: TransportProtocol) -> bool {
        self.listeners.contains_key(&protocol)
    }

    /// Registered protocols, sorted by name.
    pub fn protocols(&self) -> Vec<TransportProtocol> {
        let mut protocols: Vec<_> = self.listeners.iter().map(|entry| *entry.key()).collect();
        protocols.sort_by_key(|protocol| protocol.as_str());
        protocols
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("protocols", &self.protocols())
            .finish()
    }
}

/// Register `listen` for `protocol` in the process-wide registry.
pub fn register_transport_listener<F, Fut>(protocol: TransportProtocol, listen: F) -> Result<(), RegistryError>
where
    F: Fn(ListenContext, Address, u16) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Box<dyn Listener>, ListenError>> + Send + 'static,
{
    TransportRegistry::global().register(protocol, listen)
}
