//! Redemption requests
//!
//! Only the deposit owner may redeem, unless the vending machine holds the
//! deposit, in which case anyone with enough TBTC may.

use std::sync::Arc;

use super::Redemption;
use crate::address::redeemer_output_script;
use crate::chain::events::RedemptionRequestedEvent;
use crate::chain::{FeeParameters, TransactionReceipt};
use crate::common::error::{Result, TbtcError};
use crate::common::logging::log_redemption_event;
use crate::deposit::Deposit;
use crate::types::{Custody, RedemptionDetails};

impl Deposit {
    /// Request redemption of this deposit to `redeemer_address`.
    ///
    /// Fails without sending any transaction when the caller may not redeem,
    /// the address is invalid, or the caller's TBTC balance is too low.
    pub async fn request_redemption(self: &Arc<Self>, redeemer_address: &str) -> Result<Redemption> {
        let address = self.address().to_string();
        match self.submit_redemption_request(redeemer_address).await {
            Ok(details) => {
                log_redemption_event(
                    "redemption_requested",
                    &address,
                    redeemer_address,
                    details.utxo_size.try_into().ok(),
                    None,
                );
                Ok(Redemption::new(Arc::clone(self), details))
            }
            Err(e) => {
                log_redemption_event(
                    "redemption_request_failed",
                    &address,
                    redeemer_address,
                    None,
                    Some((e.error_code(), &e.to_string())),
                );
                Err(e)
            }
        }
    }

    async fn submit_redemption_request(&self, redeemer_address: &str) -> Result<RedemptionDetails> {
        let account = self.context.account();
        let contracts = &self.context.contracts;

        let custody = self.custody().await?;
        if let Custody::Owner(owner) = custody {
            if owner != account {
                return Err(TbtcError::ownership(format!(
                    "Redemption is currently only supported for deposits owned by this account ({}) \
                     or the tBTC Vending Machine ({}). This deposit is owned by {}.",
                    account, contracts.addresses.vending_machine, owner
                )));
            }
        }

        let output_script = redeemer_output_script(redeemer_address, self.context.bitcoin_network())?;

        let cost = self.redemption_cost_for(custody).await?;
        let balance = contracts.token.balance_of(account).await?;
        if cost > balance {
            return Err(TbtcError::validation(format!(
                "insufficient balance: account {} needs {} TBTC to redeem but only has {}",
                account, cost, balance
            )));
        }

        let output_value_bytes = self.redemption_output_value().await?;

        let receipt = match custody {
            Custody::VendingMachine => {
                tracing::debug!(deposit = %self.address(), cost = %cost, "Approving TBTC to vending machine");
                contracts
                    .token
                    .approve(contracts.addresses.vending_machine, cost)
                    .await?;

                tracing::info!(deposit = %self.address(), "Redeeming deposit from vending machine");
                contracts
                    .vending_machine
                    .tbtc_to_btc(self.address(), output_value_bytes, output_script, account)
                    .await?
            }
            Custody::Owner(_) => {
                tracing::debug!(deposit = %self.address(), cost = %cost, "Approving TBTC to deposit");
                contracts.token.approve(self.address(), cost).await?;

                tracing::info!(deposit = %self.address(), "Requesting redemption from deposit");
                self.contract
                    .request_redemption(output_value_bytes, output_script)
                    .await?
            }
        };

        self.redemption_details_from_receipt(&receipt)
    }

    /// UTXO size less the estimated fee, as 8 little-endian bytes
    async fn redemption_output_value(&self) -> Result<[u8; 8]> {
        let minimum_redemption_fee = self
            .context
            .contracts
            .system
            .get_minimum_redemption_fee()
            .await?;
        let fee = self
            .context
            .bitcoin
            .estimate_transaction_fee(&FeeParameters { minimum_redemption_fee })
            .await?;
        let utxo_size = self.contract.utxo_size().await?;

        let output_value = utxo_size.checked_sub(fee).ok_or_else(|| {
            TbtcError::validation(format!(
                "estimated fee {} exceeds UTXO size {}",
                fee, utxo_size
            ))
        })?;

        tracing::debug!(utxo_size, fee, output_value, "Computed redemption output value");
        Ok(output_value.to_le_bytes())
    }

    fn redemption_details_from_receipt(&self, receipt: &TransactionReceipt) -> Result<RedemptionDetails> {
        let event: RedemptionRequestedEvent =
            receipt.require_event(self.context.contracts.system.address())?;
        Ok(RedemptionDetails::from(&event))
    }

    /// Latest redemption details; `None` while ACTIVE or before any request
    pub async fn latest_redemption_details(&self) -> Result<Option<RedemptionDetails>> {
        if self.contract.in_active().await? {
            return Ok(None);
        }

        let event = self
            .context
            .contracts
            .system
            .find_latest_redemption_requested_event(self.address())
            .await?;
        Ok(event.as_ref().map(RedemptionDetails::from))
    }

    /// The redemption in progress, if any
    pub async fn current_redemption(self: &Arc<Self>) -> Result<Option<Redemption>> {
        Ok(self
            .latest_redemption_details()
            .await?
            .map(|details| Redemption::new(Arc::clone(self), details)))
    }
}
