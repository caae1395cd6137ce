//! Deposit Types
//!
//! On-chain deposit states, the signer group's public key point and the
//! funding proof submitted to the deposit contract.
//!
//! Funding path: START → AWAITING_SIGNER_SETUP → AWAITING_BTC_FUNDING_PROOF → ACTIVE

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::common::error::TbtcError;

/// State of a deposit contract, with its on-chain numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DepositState {
    Start = 0,
    AwaitingSignerSetup = 1,
    AwaitingBtcFundingProof = 2,
    FraudAwaitingBtcFundingProof = 3,
    FailedSetup = 4,
    Active = 5,
    AwaitingWithdrawalSignature = 6,
    AwaitingWithdrawalProof = 7,
    Redeemed = 8,
    CourtesyCall = 9,
    FraudLiquidationInProgress = 10,
    LiquidationInProgress = 11,
    Liquidated = 12,
}

impl DepositState {
    /// On-chain numeric code
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// States before the deposit is qualified (ACTIVE) on the happy path
    pub fn is_funding_path(&self) -> bool {
        matches!(
            self,
            Self::Start | Self::AwaitingSignerSetup | Self::AwaitingBtcFundingProof
        )
    }

    pub fn is_redemption_path(&self) -> bool {
        matches!(
            self,
            Self::AwaitingWithdrawalSignature | Self::AwaitingWithdrawalProof | Self::Redeemed
        )
    }

    pub fn is_liquidation_path(&self) -> bool {
        matches!(
            self,
            Self::CourtesyCall
                | Self::FraudLiquidationInProgress
                | Self::LiquidationInProgress
                | Self::Liquidated
        )
    }

    /// No further transition can occur
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FailedSetup | Self::Redeemed | Self::Liquidated)
    }
}

impl TryFrom<u8> for DepositState {
    type Error = TbtcError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        let state = match code {
            0 => Self::Start,
            1 => Self::AwaitingSignerSetup,
            2 => Self::AwaitingBtcFundingProof,
            3 => Self::FraudAwaitingBtcFundingProof,
            4 => Self::FailedSetup,
            5 => Self::Active,
            6 => Self::AwaitingWithdrawalSignature,
            7 => Self::AwaitingWithdrawalProof,
            8 => Self::Redeemed,
            9 => Self::CourtesyCall,
            10 => Self::FraudLiquidationInProgress,
            11 => Self::LiquidationInProgress,
            12 => Self::Liquidated,
            other => {
                return Err(TbtcError::state(format!("unknown deposit state code {}", other)))
            }
        };
        Ok(state)
    }
}

impl std::fmt::Display for DepositState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::AwaitingSignerSetup => "AWAITING_SIGNER_SETUP",
            Self::AwaitingBtcFundingProof => "AWAITING_BTC_FUNDING_PROOF",
            Self::FraudAwaitingBtcFundingProof => "FRAUD_AWAITING_BTC_FUNDING_PROOF",
            Self::FailedSetup => "FAILED_SETUP",
            Self::Active => "ACTIVE",
            Self::AwaitingWithdrawalSignature => "AWAITING_WITHDRAWAL_SIGNATURE",
            Self::AwaitingWithdrawalProof => "AWAITING_WITHDRAWAL_PROOF",
            Self::Redeemed => "REDEEMED",
            Self::CourtesyCall => "COURTESY_CALL",
            Self::FraudLiquidationInProgress => "FRAUD_LIQUIDATION_IN_PROGRESS",
            Self::LiquidationInProgress => "LIQUIDATION_IN_PROGRESS",
            Self::Liquidated => "LIQUIDATED",
        };
        f.write_str(name)
    }
}

/// Signer group public key, as published in the RegisteredPubkey event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyPoint {
    /// Big-endian X coordinate
    pub x: B256,
    /// Big-endian Y coordinate
    pub y: B256,
}

impl PublicKeyPoint {
    pub fn new(x: B256, y: B256) -> Self {
        Self { x, y }
    }

    /// Validate the point against secp256k1
    pub fn to_public_key(&self) -> Result<secp256k1::PublicKey, TbtcError> {
        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        uncompressed[1..33].copy_from_slice(self.x.as_slice());
        uncompressed[33..].copy_from_slice(self.y.as_slice());

        secp256k1::PublicKey::from_slice(&uncompressed)
            .map_err(|e| TbtcError::encoding(format!("signer public key is not on the curve: {}", e)))
    }

    /// 33-byte compressed SEC1 encoding
    pub fn compressed(&self) -> Result<[u8; 33], TbtcError> {
        Ok(self.to_public_key()?.serialize())
    }
}

/// Addresses produced when a deposit is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositAddresses {
    pub deposit_address: Address,
    pub keep_address: Address,
}

/// SPV proof of the funding transaction, in the order the deposit contract
/// expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingProof {
    pub version: Vec<u8>,
    pub tx_in_vector: Vec<u8>,
    pub tx_out_vector: Vec<u8>,
    pub locktime: Vec<u8>,
    /// Index of the funding output in the transaction
    pub output_position: u32,
    /// Concatenated 32-byte merkle siblings
    pub merkle_proof: Vec<u8>,
    /// Index of the transaction in its block
    pub tx_in_block_index: u64,
    /// Concatenated 80-byte headers, starting at the transaction's block
    pub chain_headers: Vec<u8>,
}

/// One argument of `provideBTCFundingProof`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofArg {
    Bytes(Vec<u8>),
    Uint(u64),
}

impl FundingProof {
    /// The eight contract arguments in protocol order
    pub fn to_args(&self) -> [ProofArg; 8] {
        [
            ProofArg::Bytes(self.version.clone()),
            ProofArg::Bytes(self.tx_in_vector.clone()),
            ProofArg::Bytes(self.tx_out_vector.clone()),
            ProofArg::Bytes(self.locktime.clone()),
            ProofArg::Uint(self.output_position as u64),
            ProofArg::Bytes(self.merkle_proof.clone()),
            ProofArg::Uint(self.tx_in_block_index),
            ProofArg::Bytes(self.chain_headers.clone()),
        ]
    }
}
