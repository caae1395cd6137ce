//! Chain collaborators
//!
//! Typed interfaces to the Bitcoin and Ethereum clients, the events their
//! receipts carry, and the deployment artifacts used to find contracts.

pub mod artifacts;
pub mod bitcoin;
pub mod ethereum;
pub mod events;

pub use artifacts::{ArtifactError, ContractAddresses, ContractArtifact, ContractRole, DeploymentRegistry};
pub use self::bitcoin::{BitcoinClient, BitcoinError, FeeParameters, FoundTransaction, SpvProofBundle};
pub use ethereum::{
    DepositContract, DepositFactoryContract, DepositTokenContract, EthereumClient, EthereumError,
    FeeRebateTokenContract, KeepContract, SystemContract, TokenContract, VendingMachineContract,
};
pub use events::{ContractEvent, EventLog, TransactionReceipt};
