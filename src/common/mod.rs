//! Common utilities shared across the client

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ConfigError, ElectrumConfig, ElectrumProfile, ElectrumProtocol, Network, TbtcConfig};
pub use error::{Result, TbtcError};
pub use logging::{init_logging, EventCategory, LogLevel, LoggingError};
