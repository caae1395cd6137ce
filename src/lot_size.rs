//! Allowed deposit lot sizes
//!
//! The set lives on the system contract and can change at any time, so it is
//! read live on every call.

use std::sync::Arc;

use crate::chain::SystemContract;
use crate::common::error::{Result, TbtcError};

#[derive(Clone)]
pub struct LotSizeRegistry {
    system: Arc<dyn SystemContract>,
}

impl LotSizeRegistry {
    pub fn new(system: Arc<dyn SystemContract>) -> Self {
        Self { system }
    }

    /// Currently allowed lot sizes, in satoshis
    pub async fn available(&self) -> Result<Vec<u64>> {
        Ok(self.system.get_allowed_lot_sizes().await?)
    }

    /// Fails with a validation error listing the allowed set when
    /// `satoshi_lot_size` is not currently permitted
    pub async fn validate(&self, satoshi_lot_size: u64) -> Result<()> {
        if self.system.is_allowed_lot_size(satoshi_lot_size).await? {
            return Ok(());
        }

        let allowed = self
            .available()
            .await?
            .iter()
            .map(|size| size.to_string())
            .collect::<Vec<_>>()
            .join(",");

        Err(TbtcError::validation(format!(
            "Lot size {} is not permitted; only one of {} can be used.",
            satoshi_lot_size, allowed
        )))
    }
}
