//! Shared bridge context
//!
//! Everything a deposit needs beyond its own contract: configuration, the two
//! chain clients, and the bridge contracts resolved for the current network.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::chain::{
    BitcoinClient, ContractAddresses, DepositFactoryContract, DepositTokenContract, EthereumClient,
    FeeRebateTokenContract, SystemContract, TokenContract, VendingMachineContract,
};
use crate::common::config::TbtcConfig;

/// Bridge contract handles bound for one network
#[derive(Clone)]
pub struct BridgeContracts {
    pub addresses: ContractAddresses,
    pub system: Arc<dyn SystemContract>,
    pub token: Arc<dyn TokenContract>,
    pub deposit_token: Arc<dyn DepositTokenContract>,
    pub fee_rebate_token: Arc<dyn FeeRebateTokenContract>,
    pub deposit_factory: Arc<dyn DepositFactoryContract>,
    pub vending_machine: Arc<dyn VendingMachineContract>,
}

impl BridgeContracts {
    /// Bind every role through the Ethereum client
    pub fn bind(ethereum: &dyn EthereumClient, addresses: ContractAddresses) -> Self {
        Self {
            addresses,
            system: ethereum.system_contract(addresses.system),
            token: ethereum.token_contract(addresses.token),
            deposit_token: ethereum.deposit_token_contract(addresses.deposit_token),
            fee_rebate_token: ethereum.fee_rebate_token_contract(addresses.fee_rebate_token),
            deposit_factory: ethereum.deposit_factory_contract(addresses.deposit_factory),
            vending_machine: ethereum.vending_machine_contract(addresses.vending_machine),
        }
    }
}

pub struct BridgeContext {
    pub config: TbtcConfig,
    pub ethereum: Arc<dyn EthereumClient>,
    pub bitcoin: Arc<dyn BitcoinClient>,
    pub contracts: BridgeContracts,
}

impl BridgeContext {
    /// Account every transaction is sent from
    pub fn account(&self) -> Address {
        self.ethereum.default_account()
    }

    pub fn bitcoin_network(&self) -> bitcoin::Network {
        self.config.bitcoin_network
    }
}
