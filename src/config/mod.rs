//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HubConfig (validated, immutable)
//!
//! Per inbound at bind time:
//!     StreamConfig + process-wide transport defaults
//!     → stream.rs (effective protocol / transport / security settings)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation resolves stream settings early so bind-time failures are rare

pub mod loader;
pub mod schema;
pub mod stream;
pub mod validation;

pub use schema::{
    CertificateConfig, HubConfig, InboundConfig, LogFormat, MkcpSettings, ObservabilityConfig, RetryConfig,
    SecuritySettings, SecurityType, StreamConfig, TcpSettings, TlsSettings, TransportSettings, WebSocketSettings,
};
pub use stream::{SettingsError, StreamSettings};
