//! Redemption Types

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::chain::events::RedemptionRequestedEvent;

/// Details of an accepted redemption request.
///
/// A fee bump emits a new RedemptionRequested event; the newest event wins and
/// earlier details are never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionDetails {
    /// Size of the deposit UTXO in satoshis
    pub utxo_size: U256,
    /// Length-prefixed output script the BTC is released to
    pub redeemer_output_script: Bytes,
    /// Fee the signers may deduct, in satoshis
    pub requested_fee: U256,
    /// Outpoint of the deposit UTXO being spent
    pub outpoint: Bytes,
    /// Sighash digest the signers sign
    pub digest: B256,
}

impl From<&RedemptionRequestedEvent> for RedemptionDetails {
    fn from(event: &RedemptionRequestedEvent) -> Self {
        Self {
            utxo_size: event.utxo_size,
            redeemer_output_script: event.redeemer_output_script.clone(),
            requested_fee: event.requested_fee,
            outpoint: event.outpoint.clone(),
            digest: event.digest,
        }
    }
}

/// Who holds the deposit token when a redemption is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Custody {
    /// The vending machine holds the TDT; anyone with enough TBTC may redeem
    VendingMachine,
    /// An account holds the TDT directly
    Owner(Address),
}
