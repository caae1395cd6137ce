//! Common Error Types for the tBTC Client
//!
//! Every fallible operation on a deposit resolves to one of these kinds.
//! The enum is `Clone` because watcher and pipeline results are settled once
//! and then handed to every awaiting caller.

use thiserror::Error;

use crate::chain::{ArtifactError, BitcoinError, EthereumError};

/// Root error type for the tBTC client
#[derive(Debug, Clone, Error)]
pub enum TbtcError {
    /// Contract deployment info missing or configuration invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid lot size, redeemer address, or insufficient balance
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation attempted while the deposit is in the wrong state
    #[error("state error: {0}")]
    State(String),

    /// Funding transaction missing, under-confirmed, or malformed proof data
    #[error("proof error: {0}")]
    Proof(String),

    /// An expected acknowledgment event is absent from a receipt
    #[error("protocol event missing: {0}")]
    ProtocolEventMissing(String),

    /// Caller is not authorized for this operation
    #[error("ownership error: {0}")]
    Ownership(String),

    /// Deposit (or its creation event) could not be located
    #[error("not found: {0}")]
    NotFound(String),

    /// Bitcoin client collaborator failure
    #[error("bitcoin error: {0}")]
    Bitcoin(#[from] BitcoinError),

    /// Ethereum client collaborator failure
    #[error("ethereum error: {0}")]
    Ethereum(#[from] EthereumError),

    /// Hex, address or script encoding failure
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl TbtcError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a proof error
    pub fn proof(msg: impl Into<String>) -> Self {
        Self::Proof(msg.into())
    }

    /// Create a protocol-event-missing error
    pub fn event_missing(msg: impl Into<String>) -> Self {
        Self::ProtocolEventMissing(msg.into())
    }

    /// Create an ownership error
    pub fn ownership(msg: impl Into<String>) -> Self {
        Self::Ownership(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Whether re-invoking the failed operation could plausibly succeed.
    ///
    /// Nothing in this crate retries on its own; this is for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            TbtcError::Bitcoin(e) => e.is_transient(),
            TbtcError::Ethereum(e) => e.is_transient(),
            TbtcError::Proof(_) => true,
            _ => false,
        }
    }

    /// Stable error code for logs and callers
    pub fn error_code(&self) -> &'static str {
        match self {
            TbtcError::Configuration(_) => "CONFIGURATION_ERROR",
            TbtcError::Validation(_) => "VALIDATION_ERROR",
            TbtcError::State(_) => "STATE_ERROR",
            TbtcError::Proof(_) => "PROOF_ERROR",
            TbtcError::ProtocolEventMissing(_) => "PROTOCOL_EVENT_MISSING",
            TbtcError::Ownership(_) => "OWNERSHIP_ERROR",
            TbtcError::NotFound(_) => "NOT_FOUND",
            TbtcError::Bitcoin(_) => "BITCOIN_ERROR",
            TbtcError::Ethereum(_) => "ETHEREUM_ERROR",
            TbtcError::Encoding(_) => "ENCODING_ERROR",
        }
    }
}

impl From<ArtifactError> for TbtcError {
    fn from(err: ArtifactError) -> Self {
        TbtcError::Configuration(err.to_string())
    }
}

impl From<super::config::ConfigError> for TbtcError {
    fn from(err: super::config::ConfigError) -> Self {
        TbtcError::Configuration(err.to_string())
    }
}

/// Result type alias using TbtcError
pub type Result<T> = std::result::Result<T, TbtcError>;
