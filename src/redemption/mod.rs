//! Redemption
//!
//! Cost calculation, request submission, and a handle to a redemption in
//! progress. Details are only ever replaced by a newer RedemptionRequested
//! event (fee bump), so callers refresh rather than cache.

pub mod calculator;
pub mod flow;

use std::sync::Arc;

use crate::common::error::Result;
use crate::deposit::Deposit;
use crate::types::RedemptionDetails;

pub use calculator::vending_machine_redemption_cost;

/// A redemption in progress on one deposit
pub struct Redemption {
    deposit: Arc<Deposit>,
    details: RedemptionDetails,
}

impl Redemption {
    pub fn new(deposit: Arc<Deposit>, details: RedemptionDetails) -> Self {
        Self { deposit, details }
    }

    pub fn deposit(&self) -> &Arc<Deposit> {
        &self.deposit
    }

    /// Details as last observed
    pub fn details(&self) -> &RedemptionDetails {
        &self.details
    }

    /// Refetch the latest details, picking up fee bumps. Keeps the current
    /// details if the chain reports none.
    pub async fn refresh(&mut self) -> Result<&RedemptionDetails> {
        if let Some(latest) = self.deposit.latest_redemption_details().await? {
            if latest != self.details {
                tracing::info!(
                    deposit = %self.deposit.address(),
                    requested_fee = %latest.requested_fee,
                    "Redemption details updated"
                );
            }
            self.details = latest;
        }
        Ok(&self.details)
    }
}
