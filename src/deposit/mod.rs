//! Deposit
//!
//! A handle to one deposit contract and its backing keep. Creating a handle
//! starts two watchers (signer public key, ACTIVE state); everything else is
//! driven by the caller or by the auto-submit pipeline.
//!
//! Funding path:
//! START → AWAITING_SIGNER_SETUP → AWAITING_BTC_FUNDING_PROOF → ACTIVE

pub mod auto_submit;
pub mod minting;
pub mod state;
pub mod watchers;

use std::sync::{Arc, OnceLock};

use alloy_primitives::{Address, U256};
use tokio::sync::{watch, OnceCell};

use crate::address::public_key_point_to_p2wpkh_address;
use crate::chain::DepositContract;
use crate::common::error::Result;
use crate::context::BridgeContext;
use crate::signal::Settled;
use crate::types::{DepositAddresses, DepositState, PublicKeyPoint};

pub use auto_submit::{AutoSubmitHandle, AutoSubmitStage, FundingConfirmations};
pub use state::StateTracker;

pub struct Deposit {
    pub(crate) context: Arc<BridgeContext>,
    address: Address,
    keep_address: Address,
    pub(crate) contract: Arc<dyn DepositContract>,

    lot_size: OnceCell<u64>,
    public_key: Settled<PublicKeyPoint>,
    active: Settled<()>,
    bitcoin_address: OnceCell<String>,
    auto_submit: OnceLock<AutoSubmitHandle>,
    tracker: StateTracker,
}

impl Deposit {
    /// Bind the deposit and keep contracts and start the watchers.
    /// Must be called from within a tokio runtime.
    pub fn attach(context: Arc<BridgeContext>, addresses: DepositAddresses) -> Arc<Self> {
        let DepositAddresses { deposit_address, keep_address } = addresses;
        let contract = context.ethereum.deposit_contract(deposit_address);
        let keep = context.ethereum.keep_contract(keep_address);
        let system = Arc::clone(&context.contracts.system);
        let tracker = StateTracker::new();

        let public_key = watchers::spawn_public_key_watcher(
            deposit_address,
            Arc::clone(&system),
            Arc::clone(&contract),
            keep,
            tracker.clone(),
        );
        let active = watchers::spawn_active_state_watcher(
            deposit_address,
            system,
            Arc::clone(&contract),
            tracker.clone(),
        );

        Arc::new(Self {
            context,
            address: deposit_address,
            keep_address,
            contract,
            lot_size: OnceCell::new(),
            public_key,
            active,
            bitcoin_address: OnceCell::new(),
            auto_submit: OnceLock::new(),
            tracker,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn keep_address(&self) -> Address {
        self.keep_address
    }

    /// Token id of this deposit's TDT and fee rebate token
    pub fn token_id(&self) -> U256 {
        U256::from_be_slice(self.address.as_slice())
    }

    /// Lot size in satoshis, read once
    pub async fn lot_size(&self) -> Result<u64> {
        let size = self
            .lot_size
            .get_or_try_init(|| async { self.contract.lot_size_satoshis().await })
            .await?;
        Ok(*size)
    }

    /// Read the contract state. A stale funding-path read returns the most
    /// advanced state already observed instead.
    pub async fn current_state(&self) -> Result<DepositState> {
        let code = self.contract.current_state().await?;
        let state = DepositState::try_from(code)?;
        Ok(self.tracker.observe(state))
    }

    /// Accepted state observations, from reads and watchers
    pub fn state_updates(&self) -> watch::Receiver<Option<DepositState>> {
        self.tracker.subscribe()
    }

    /// Current holder of the deposit token
    pub async fn owner(&self) -> Result<Address> {
        Ok(self
            .context
            .contracts
            .deposit_token
            .owner_of(self.token_id())
            .await?)
    }

    /// Holder of the fee rebate token, `None` before it is minted
    pub async fn fee_rebate_token_owner(&self) -> Result<Option<Address>> {
        Ok(self
            .context
            .contracts
            .fee_rebate_token
            .owner_of(self.token_id())
            .await?)
    }

    pub async fn in_vending_machine(&self) -> Result<bool> {
        Ok(self.owner().await? == self.context.contracts.addresses.vending_machine)
    }

    /// Signer group public key; waits until the keep has published it
    pub async fn public_key_point(&self) -> Result<PublicKeyPoint> {
        self.public_key.wait().await
    }

    /// Bitcoin address the lot size must be sent to; derived once
    pub async fn bitcoin_address(&self) -> Result<String> {
        let address = self
            .bitcoin_address
            .get_or_try_init(|| async {
                let point = self.public_key_point().await?;
                public_key_point_to_p2wpkh_address(&point, self.context.bitcoin_network())
            })
            .await?;
        Ok(address.clone())
    }

    /// Resolves once the deposit has been observed entering ACTIVE
    pub async fn wait_for_active(&self) -> Result<()> {
        self.active.wait().await
    }
}
