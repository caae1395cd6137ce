//! Domain types shared by the deposit and redemption flows

pub mod deposit;
pub mod redemption;
pub mod units;

pub use deposit::{DepositAddresses, DepositState, FundingProof, ProofArg, PublicKeyPoint};
pub use redemption::{Custody, RedemptionDetails};
