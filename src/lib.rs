//! tBTC Client - Deposit Lifecycle Orchestration
//!
//! Drives a single tBTC deposit from creation through funding, qualification
//! and minting, to redemption. State lives on two chains; this crate watches
//! both through the [`chain::BitcoinClient`] and [`chain::EthereumClient`]
//! interfaces and never forces a transition itself.
//!
//! ## Flow
//!
//! 1. [`DepositFactory`] opens a deposit of an allowed lot size, or attaches
//!    to an existing one
//! 2. The [`Deposit`] handle watches for the signer public key and derives
//!    the Bitcoin funding address
//! 3. [`Deposit::auto_submit`] finds the funding transaction, waits for
//!    confirmations and submits the SPV proof
//! 4. [`Deposit::mint_tbtc`] / [`Deposit::qualify_and_mint_tbtc`] mint TBTC
//! 5. [`Deposit::request_redemption`] redeems the deposit back to BTC

pub mod address;
pub mod chain;
pub mod common;
pub mod context;
pub mod deposit;
pub mod factory;
pub mod funding_proof;
pub mod lot_size;
pub mod redemption;
pub mod signal;
pub mod types;

// Re-exports: configuration, errors, logging
pub use common::{init_logging, LogLevel, Network, Result, TbtcConfig, TbtcError};

// Re-exports: lifecycle
pub use deposit::{AutoSubmitHandle, AutoSubmitStage, Deposit, FundingConfirmations};
pub use factory::DepositFactory;
pub use redemption::Redemption;

// Re-exports: domain types
pub use types::{
    DepositAddresses, DepositState, FundingProof, ProofArg, PublicKeyPoint, RedemptionDetails,
};
