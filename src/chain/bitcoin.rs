//! Bitcoin Chain Client Interface
//!
//! Transaction lookup, confirmation tracking, fee estimation and SPV proof
//! extraction, as provided by an Electrum-backed client. Transport is the
//! implementor's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bitcoin client errors
#[derive(Debug, Clone, Error)]
pub enum BitcoinError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("proof unavailable: {0}")]
    ProofUnavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BitcoinError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BitcoinError::Connection(_) | BitcoinError::ProofUnavailable(_)
        )
    }
}

/// A transaction paying a watched address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundTransaction {
    /// Transaction id, big-endian hex as shown by explorers
    pub transaction_id: String,
    /// Index of the output paying the watched address
    pub output_position: u32,
    /// Output value in satoshis
    pub value: u64,
}

/// Inputs to fee estimation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParameters {
    /// Floor set by the bridge's constants, in satoshis
    pub minimum_redemption_fee: u64,
}

/// Serialized transaction split into the fields the proof verifier hashes.
/// All hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub version: String,
    pub tx_in_vector: String,
    pub tx_out_vector: String,
    pub locktime: String,
}

/// SPV proof material for one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpvProofBundle {
    pub parsed_transaction: ParsedTransaction,
    /// Concatenated merkle siblings, hex
    pub merkle_proof: String,
    /// Concatenated block headers, hex
    pub chain_headers: String,
    pub tx_in_block_index: u64,
}

/// Bitcoin chain access
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BitcoinClient: Send + Sync {
    /// Look for a transaction paying exactly `value` satoshis to `address`
    async fn find_transaction(
        &self,
        address: &str,
        value: u64,
    ) -> Result<Option<FoundTransaction>, BitcoinError>;

    /// Like `find_transaction`, suspending until such a transaction appears
    async fn find_or_wait_for(&self, address: &str, value: u64)
        -> Result<FoundTransaction, BitcoinError>;

    /// Suspend until `transaction` has `required` confirmations; returns the
    /// confirmation count observed
    async fn wait_for_confirmations(
        &self,
        transaction: &FoundTransaction,
        required: u64,
    ) -> Result<u64, BitcoinError>;

    /// Whether `transaction` currently has at least `required` confirmations
    async fn check_for_confirmations(
        &self,
        transaction: &FoundTransaction,
        required: u64,
    ) -> Result<bool, BitcoinError>;

    /// Estimated fee, in satoshis, for a redemption transaction
    async fn estimate_transaction_fee(&self, params: &FeeParameters) -> Result<u64, BitcoinError>;

    /// Proof material for `transaction_id` with `confirmations` headers
    async fn get_spv_proof(
        &self,
        transaction_id: &str,
        confirmations: u64,
    ) -> Result<SpvProofBundle, BitcoinError>;
}
