//! Decoded Contract Events
//!
//! The Ethereum client decodes logs into these types; receipts carry them
//! together with the address of the contract that emitted them.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::common::error::TbtcError;

/// `Created(depositContractAddress, keepAddress, timestamp)` from the system contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub deposit_contract_address: Address,
    pub keep_address: Address,
    pub timestamp: u64,
}

/// `RegisteredPubkey` from the system contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredPubkeyEvent {
    pub deposit_contract_address: Address,
    pub signing_group_pubkey_x: B256,
    pub signing_group_pubkey_y: B256,
    pub timestamp: u64,
}

/// `Funded` from the system contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundedEvent {
    pub deposit_contract_address: Address,
    pub txid: B256,
    pub timestamp: u64,
}

/// `PublicKeyPublished` from the keep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyPublishedEvent {
    pub public_key: Bytes,
}

/// `RedemptionRequested` from the system contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRequestedEvent {
    pub deposit_contract_address: Address,
    pub requester: Address,
    pub digest: B256,
    pub utxo_size: U256,
    pub redeemer_output_script: Bytes,
    pub requested_fee: U256,
    pub outpoint: Bytes,
}

/// ERC-20 / ERC-721 `Transfer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    Created(CreatedEvent),
    RegisteredPubkey(RegisteredPubkeyEvent),
    Funded(FundedEvent),
    PublicKeyPublished(PublicKeyPublishedEvent),
    RedemptionRequested(RedemptionRequestedEvent),
    Transfer(TransferEvent),
}

/// A decoded log and the contract that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub emitter: Address,
    pub event: ContractEvent,
}

/// Receipt of a mined transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub logs: Vec<EventLog>,
}

/// An event type that can be picked out of a receipt
pub trait ContractEventKind: Sized {
    /// Solidity event name
    const NAME: &'static str;

    fn from_event(event: &ContractEvent) -> Option<Self>;
}

macro_rules! event_kind {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl ContractEventKind for $ty {
            const NAME: &'static str = $name;

            fn from_event(event: &ContractEvent) -> Option<Self> {
                match event {
                    ContractEvent::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

event_kind!(CreatedEvent, Created, "Created");
event_kind!(RegisteredPubkeyEvent, RegisteredPubkey, "RegisteredPubkey");
event_kind!(FundedEvent, Funded, "Funded");
event_kind!(PublicKeyPublishedEvent, PublicKeyPublished, "PublicKeyPublished");
event_kind!(RedemptionRequestedEvent, RedemptionRequested, "RedemptionRequested");
event_kind!(TransferEvent, Transfer, "Transfer");

impl TransactionReceipt {
    /// First event of type `E` emitted by `emitter`, if any
    pub fn read_event<E: ContractEventKind>(&self, emitter: Address) -> Option<E> {
        self.logs
            .iter()
            .filter(|log| log.emitter == emitter)
            .find_map(|log| E::from_event(&log.event))
    }

    /// Like [`read_event`](Self::read_event), failing with
    /// `ProtocolEventMissing` when absent
    pub fn require_event<E: ContractEventKind>(&self, emitter: Address) -> Result<E, TbtcError> {
        self.read_event(emitter).ok_or_else(|| {
            TbtcError::event_missing(format!(
                "{} event not found in transaction {} (emitter {})",
                E::NAME,
                self.transaction_hash,
                emitter
            ))
        })
    }
}
