//! Redemption cost
//!
//! Redeeming straight from the owner costs whatever the deposit asks of the
//! caller. Redeeming a deposit held by the vending machine additionally buys
//! the deposit token back: the full lot in TBTC plus the owner requirement.

use alloy_primitives::U256;

use crate::common::error::Result;
use crate::deposit::Deposit;
use crate::types::units::satoshis_to_tbtc;
use crate::types::Custody;

/// Cost of redeeming a vending-machine-held deposit of `lot_size_sats`
pub fn vending_machine_redemption_cost(lot_size_sats: u64, owner_requirement: U256) -> U256 {
    satoshis_to_tbtc(U256::from(lot_size_sats)) + owner_requirement
}

impl Deposit {
    /// Who holds the deposit token
    pub async fn custody(&self) -> Result<Custody> {
        let owner = self.owner().await?;
        if owner == self.context.contracts.addresses.vending_machine {
            Ok(Custody::VendingMachine)
        } else {
            Ok(Custody::Owner(owner))
        }
    }

    /// TBTC the default account must pay to redeem this deposit
    pub async fn redemption_cost(&self) -> Result<U256> {
        let custody = self.custody().await?;
        self.redemption_cost_for(custody).await
    }

    pub(crate) async fn redemption_cost_for(&self, custody: Custody) -> Result<U256> {
        let account = self.context.account();
        match custody {
            Custody::VendingMachine => {
                let owner_requirement = self
                    .contract
                    .get_owner_redemption_tbtc_requirement(account)
                    .await?;
                Ok(vending_machine_redemption_cost(self.lot_size().await?, owner_requirement))
            }
            Custody::Owner(_) => Ok(self.contract.get_redemption_tbtc_requirement(account).await?),
        }
    }
}
