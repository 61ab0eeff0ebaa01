//! Transport listener hub library.

pub mod config;
pub mod hub;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use config::schema::HubConfig;
pub use hub::{handler_fn, Binder, HubError, ListenerHub};
pub use lifecycle::Shutdown;
pub use transport::{TransportProtocol, TransportRegistry};
