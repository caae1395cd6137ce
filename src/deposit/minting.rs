//! TBTC minting through the vending machine

use alloy_primitives::U256;

use super::Deposit;
use crate::chain::events::TransferEvent;
use crate::chain::TransactionReceipt;
use crate::common::error::{Result, TbtcError};
use crate::common::logging::{log_deposit_event, EventCategory};
use crate::funding_proof::ProofBuilder;
use crate::types::units::tbtc_to_whole_tokens;

impl Deposit {
    /// Exchange the deposit token of an ACTIVE deposit for TBTC.
    ///
    /// Returns the minted amount in TBTC base units.
    pub async fn mint_tbtc(&self) -> Result<U256> {
        if !self.contract.in_active().await? {
            return Err(TbtcError::state(
                "Can't mint TBTC with a deposit that isn't in ACTIVE state.",
            ));
        }

        let contracts = &self.context.contracts;
        tracing::debug!(deposit = %self.address(), "Approving TDT transfer to vending machine");
        contracts
            .deposit_token
            .approve(contracts.addresses.vending_machine, self.token_id())
            .await?;

        let receipt = contracts.vending_machine.tdt_to_tbtc(self.token_id()).await?;
        let minted = self.minted_amount(&receipt)?;

        log_deposit_event(
            EventCategory::Minting,
            "tbtc_minted",
            &self.address().to_string(),
            Some(self.lot_size().await?),
            None,
        );
        Ok(minted)
    }

    /// Qualify a funded deposit and mint TBTC in one vending machine call.
    ///
    /// The funding transaction must already exist with enough confirmations.
    /// Returns the minted amount in whole TBTC.
    pub async fn qualify_and_mint_tbtc(&self) -> Result<U256> {
        let address = self.bitcoin_address().await?;
        let lot_size = self.lot_size().await?;
        let bitcoin = &self.context.bitcoin;
        let contracts = &self.context.contracts;

        let transaction = bitcoin
            .find_transaction(&address, lot_size)
            .await?
            .ok_or_else(|| {
                TbtcError::proof(format!(
                    "Funding transaction not found for deposit {}.",
                    self.address()
                ))
            })?;

        let required_confirmations = contracts.system.get_tx_proof_difficulty_factor().await?;
        if !bitcoin
            .check_for_confirmations(&transaction, required_confirmations)
            .await?
        {
            return Err(TbtcError::proof(format!(
                "Funding transaction did not have sufficient confirmations; expected {}.",
                required_confirmations
            )));
        }

        contracts
            .deposit_token
            .approve(contracts.addresses.vending_machine, self.token_id())
            .await?;

        let proof = ProofBuilder::new(bitcoin.clone())
            .construct_funding_proof(&transaction, required_confirmations)
            .await?;

        tracing::info!(
            deposit = %self.address(),
            txid = %transaction.transaction_id,
            "Qualifying and minting through vending machine"
        );
        let receipt = contracts
            .vending_machine
            .unqualified_deposit_to_tbtc(self.address(), &proof)
            .await?;
        let minted = self.minted_amount(&receipt)?;

        log_deposit_event(
            EventCategory::Minting,
            "deposit_qualified_and_minted",
            &self.address().to_string(),
            Some(lot_size),
            None,
        );
        Ok(tbtc_to_whole_tokens(minted))
    }

    fn minted_amount(&self, receipt: &TransactionReceipt) -> Result<U256> {
        let transfer: TransferEvent = receipt.require_event(self.context.contracts.addresses.token)?;
        Ok(transfer.value)
    }
}
