//! Deposit Factory
//!
//! Entry point of the client: resolves the bridge contracts for the network
//! the Ethereum client is connected to, then opens new deposits or attaches
//! to existing ones.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::chain::events::CreatedEvent;
use crate::chain::{BitcoinClient, ContractAddresses, DeploymentRegistry, EthereumClient};
use crate::common::config::TbtcConfig;
use crate::common::error::{Result, TbtcError};
use crate::common::logging::{log_deposit_event, EventCategory};
use crate::context::{BridgeContext, BridgeContracts};
use crate::deposit::Deposit;
use crate::lot_size::LotSizeRegistry;
use crate::types::DepositAddresses;

pub struct DepositFactory {
    context: Arc<BridgeContext>,
    lot_sizes: LotSizeRegistry,
}

impl DepositFactory {
    /// Resolve and bind the bridge contracts for the connected network
    pub async fn with_config(
        config: TbtcConfig,
        ethereum: Arc<dyn EthereumClient>,
        bitcoin: Arc<dyn BitcoinClient>,
        registry: &DeploymentRegistry,
    ) -> Result<Self> {
        let addresses = Self::resolve_contracts(ethereum.as_ref(), registry).await?;
        let contracts = BridgeContracts::bind(ethereum.as_ref(), addresses);
        let lot_sizes = LotSizeRegistry::new(Arc::clone(&contracts.system));

        tracing::info!(
            network = %config.network,
            system = %addresses.system,
            vending_machine = %addresses.vending_machine,
            "Deposit factory initialized"
        );

        Ok(Self {
            context: Arc::new(BridgeContext {
                config,
                ethereum,
                bitcoin,
                contracts,
            }),
            lot_sizes,
        })
    }

    /// Configuration and artifacts from the environment
    /// (`TBTC_ARTIFACTS_DIR` is required here)
    pub async fn from_env(
        ethereum: Arc<dyn EthereumClient>,
        bitcoin: Arc<dyn BitcoinClient>,
    ) -> Result<Self> {
        let config = TbtcConfig::from_dotenv()?;
        config.log_summary();

        let dir = config
            .artifacts_dir
            .clone()
            .ok_or_else(|| TbtcError::configuration("TBTC_ARTIFACTS_DIR is not set"))?;
        let registry = DeploymentRegistry::from_dir(dir)?;

        Self::with_config(config, ethereum, bitcoin, &registry).await
    }

    /// Deployment addresses of every bridge contract for the network id the
    /// Ethereum client reports
    pub async fn resolve_contracts(
        ethereum: &dyn EthereumClient,
        registry: &DeploymentRegistry,
    ) -> Result<ContractAddresses> {
        let network_id = ethereum.network_id().await?;
        Ok(registry.resolve(&network_id)?)
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.context
    }

    /// Allowed lot sizes, in satoshis, read live from the system contract
    pub async fn available_satoshi_lot_sizes(&self) -> Result<Vec<u64>> {
        self.lot_sizes.available().await
    }

    /// Open a new deposit of `satoshi_lot_size`
    pub async fn with_satoshi_lot_size(&self, satoshi_lot_size: u64) -> Result<Arc<Deposit>> {
        self.lot_sizes.validate(satoshi_lot_size).await?;

        let addresses = self.create_new_deposit_contract(satoshi_lot_size).await?;
        Ok(Deposit::attach(Arc::clone(&self.context), addresses))
    }

    /// Attach to the existing deposit at `address`
    pub async fn with_address(&self, address: Address) -> Result<Arc<Deposit>> {
        let created = self.find_created_event(address).await?;

        tracing::debug!(deposit = %address, keep = %created.keep_address, "Attaching to deposit");
        Ok(Deposit::attach(
            Arc::clone(&self.context),
            DepositAddresses {
                deposit_address: address,
                keep_address: created.keep_address,
            },
        ))
    }

    /// Send `createDeposit` with the creation fee, returning the new deposit
    /// and keep addresses from the Created event
    pub async fn create_new_deposit_contract(&self, lot_size: u64) -> Result<DepositAddresses> {
        let contracts = &self.context.contracts;
        let account = self.context.account();

        let creation_cost = contracts.system.create_new_deposit_fee_estimate().await?;
        let balance = self.context.ethereum.get_balance(account).await?;
        if creation_cost > balance {
            return Err(TbtcError::validation(format!(
                "insufficient balance {} to open deposit (required: {})",
                balance, creation_cost
            )));
        }

        tracing::info!(lot_size, creation_cost = %creation_cost, "Creating new deposit contract");
        let receipt = contracts
            .deposit_factory
            .create_deposit(lot_size, creation_cost)
            .await?;

        let created: CreatedEvent = receipt.require_event(contracts.system.address())?;
        let addresses = DepositAddresses {
            deposit_address: created.deposit_contract_address,
            keep_address: created.keep_address,
        };

        log_deposit_event(
            EventCategory::Deposit,
            "deposit_created",
            &addresses.deposit_address.to_string(),
            Some(lot_size),
            None,
        );
        Ok(addresses)
    }

    async fn find_created_event(&self, address: Address) -> Result<CreatedEvent> {
        self.context
            .contracts
            .system
            .find_created_event(address)
            .await?
            .ok_or_else(|| {
                TbtcError::not_found(format!("no Created event found for deposit {}", address))
            })
    }
}
