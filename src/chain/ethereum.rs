//! Ethereum Chain Client Interface
//!
//! One typed handle per contract role. Implementations wrap an RPC provider
//! and ABI bindings; calls that send transactions return the mined receipt
//! with decoded logs. Nonce management and gas estimation belong to the
//! implementation.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use thiserror::Error;

use super::events::{
    CreatedEvent, FundedEvent, PublicKeyPublishedEvent, RedemptionRequestedEvent,
    RegisteredPubkeyEvent, TransactionReceipt,
};
use crate::types::FundingProof;

/// Ethereum client errors
#[derive(Debug, Clone, Error)]
pub enum EthereumError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("call failed: {0}")]
    Call(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl EthereumError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EthereumError::Connection(_))
    }
}

pub type EthResult<T> = Result<T, EthereumError>;

/// Entry point to the Ethereum side: account info and contract binding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EthereumClient: Send + Sync {
    /// Network id used to pick deployment addresses from artifacts
    async fn network_id(&self) -> EthResult<String>;

    /// Account transactions are sent from
    fn default_account(&self) -> Address;

    /// Ether balance in wei
    async fn get_balance(&self, account: Address) -> EthResult<U256>;

    fn system_contract(&self, address: Address) -> Arc<dyn SystemContract>;
    fn token_contract(&self, address: Address) -> Arc<dyn TokenContract>;
    fn deposit_token_contract(&self, address: Address) -> Arc<dyn DepositTokenContract>;
    fn fee_rebate_token_contract(&self, address: Address) -> Arc<dyn FeeRebateTokenContract>;
    fn deposit_factory_contract(&self, address: Address) -> Arc<dyn DepositFactoryContract>;
    fn vending_machine_contract(&self, address: Address) -> Arc<dyn VendingMachineContract>;
    fn deposit_contract(&self, address: Address) -> Arc<dyn DepositContract>;
    fn keep_contract(&self, address: Address) -> Arc<dyn KeepContract>;
}

/// TBTCSystem: registry of lot sizes and constants, and the emitter of all
/// deposit lifecycle events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SystemContract: Send + Sync {
    fn address(&self) -> Address;

    /// Allowed lot sizes in satoshis
    async fn get_allowed_lot_sizes(&self) -> EthResult<Vec<u64>>;

    async fn is_allowed_lot_size(&self, lot_size: u64) -> EthResult<bool>;

    /// Wei required to open a deposit (keep creation)
    async fn create_new_deposit_fee_estimate(&self) -> EthResult<U256>;

    /// Confirmations required on the funding transaction
    async fn get_tx_proof_difficulty_factor(&self) -> EthResult<u64>;

    /// Minimum redemption fee in satoshis
    async fn get_minimum_redemption_fee(&self) -> EthResult<u64>;

    async fn find_created_event(&self, deposit: Address) -> EthResult<Option<CreatedEvent>>;

    async fn find_registered_pubkey_event(
        &self,
        deposit: Address,
    ) -> EthResult<Option<RegisteredPubkeyEvent>>;

    /// Suspends until a Funded event for `deposit` is observed
    async fn wait_for_funded_event(&self, deposit: Address) -> EthResult<FundedEvent>;

    /// Most recent RedemptionRequested event for `deposit`
    async fn find_latest_redemption_requested_event(
        &self,
        deposit: Address,
    ) -> EthResult<Option<RedemptionRequestedEvent>>;
}

/// DepositFactory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepositFactoryContract: Send + Sync {
    fn address(&self) -> Address;

    /// `createDeposit(lotSize)` carrying `value` wei
    async fn create_deposit(&self, lot_size: u64, value: U256) -> EthResult<TransactionReceipt>;
}

/// A single deposit contract
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepositContract: Send + Sync {
    fn address(&self) -> Address;

    /// Raw state code
    async fn current_state(&self) -> EthResult<u8>;

    async fn in_active(&self) -> EthResult<bool>;

    async fn lot_size_satoshis(&self) -> EthResult<u64>;

    /// Size of the funded UTXO in satoshis
    async fn utxo_size(&self) -> EthResult<u64>;

    /// TBTC `requester` must pay to redeem directly
    async fn get_redemption_tbtc_requirement(&self, requester: Address) -> EthResult<U256>;

    /// TBTC owed to the owner on redemption
    async fn get_owner_redemption_tbtc_requirement(&self, requester: Address) -> EthResult<U256>;

    async fn retrieve_signer_pubkey(&self) -> EthResult<TransactionReceipt>;

    async fn provide_btc_funding_proof(&self, proof: &FundingProof) -> EthResult<TransactionReceipt>;

    async fn request_redemption(
        &self,
        output_value_bytes: [u8; 8],
        redeemer_output_script: Bytes,
    ) -> EthResult<TransactionReceipt>;
}

/// The keep backing a deposit
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeepContract: Send + Sync {
    fn address(&self) -> Address;

    /// Suspends until the keep publishes its public key
    async fn wait_for_public_key_published(&self) -> EthResult<PublicKeyPublishedEvent>;
}

/// TBTCDepositToken (ERC-721; token id is the deposit address)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepositTokenContract: Send + Sync {
    fn address(&self) -> Address;

    async fn owner_of(&self, token_id: U256) -> EthResult<Address>;

    async fn approve(&self, to: Address, token_id: U256) -> EthResult<TransactionReceipt>;
}

/// FeeRebateToken (ERC-721)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeeRebateTokenContract: Send + Sync {
    fn address(&self) -> Address;

    /// `None` while the token has not been minted
    async fn owner_of(&self, token_id: U256) -> EthResult<Option<Address>>;
}

/// TBTCToken (ERC-20)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenContract: Send + Sync {
    fn address(&self) -> Address;

    async fn balance_of(&self, account: Address) -> EthResult<U256>;

    async fn approve(&self, spender: Address, amount: U256) -> EthResult<TransactionReceipt>;
}

/// VendingMachine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VendingMachineContract: Send + Sync {
    fn address(&self) -> Address;

    async fn tdt_to_tbtc(&self, tdt_id: U256) -> EthResult<TransactionReceipt>;

    async fn unqualified_deposit_to_tbtc(
        &self,
        deposit: Address,
        proof: &FundingProof,
    ) -> EthResult<TransactionReceipt>;

    async fn tbtc_to_btc(
        &self,
        deposit: Address,
        output_value_bytes: [u8; 8],
        redeemer_output_script: Bytes,
        requester: Address,
    ) -> EthResult<TransactionReceipt>;
}
