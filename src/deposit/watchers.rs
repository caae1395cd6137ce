//! Background watchers started with every deposit handle
//!
//! Each watcher runs as its own task and settles a single cell. Only the
//! funding → ACTIVE edge is watched; a deposit re-entering ACTIVE after a
//! courtesy call is not reported here.

use std::sync::Arc;

use alloy_primitives::Address;

use super::state::StateTracker;
use crate::chain::events::RegisteredPubkeyEvent;
use crate::chain::{DepositContract, KeepContract, SystemContract};
use crate::common::error::Result;
use crate::signal::{self, Settled};
use crate::types::{DepositState, PublicKeyPoint};

/// Resolve the signer group's public key, retrieving it onto the deposit
/// once the keep publishes it
pub(crate) fn spawn_public_key_watcher(
    deposit: Address,
    system: Arc<dyn SystemContract>,
    contract: Arc<dyn DepositContract>,
    keep: Arc<dyn KeepContract>,
    tracker: StateTracker,
) -> Settled<PublicKeyPoint> {
    let (settler, settled) = signal::channel();

    tokio::spawn(async move {
        let outcome = find_or_wait_for_public_key(deposit, system.as_ref(), contract.as_ref(), keep.as_ref()).await;
        match &outcome {
            Ok(_) => {
                tracker.observe(DepositState::AwaitingBtcFundingProof);
                tracing::info!(deposit = %deposit, "Signer public key available");
            }
            Err(e) => tracing::warn!(deposit = %deposit, error = %e, "Public key watcher failed"),
        }
        settler.settle(outcome);
    });

    settled
}

async fn find_or_wait_for_public_key(
    deposit: Address,
    system: &dyn SystemContract,
    contract: &dyn DepositContract,
    keep: &dyn KeepContract,
) -> Result<PublicKeyPoint> {
    if let Some(event) = system.find_registered_pubkey_event(deposit).await? {
        return Ok(point_from_event(&event));
    }

    tracing::debug!(deposit = %deposit, keep = %keep.address(), "Waiting for keep to publish public key");
    keep.wait_for_public_key_published().await?;

    tracing::debug!(deposit = %deposit, "Retrieving signer public key");
    let receipt = contract.retrieve_signer_pubkey().await?;
    let event: RegisteredPubkeyEvent = receipt.require_event(system.address())?;

    Ok(point_from_event(&event))
}

fn point_from_event(event: &RegisteredPubkeyEvent) -> PublicKeyPoint {
    PublicKeyPoint::new(event.signing_group_pubkey_x, event.signing_group_pubkey_y)
}

/// Resolve once the deposit is observed ACTIVE
pub(crate) fn spawn_active_state_watcher(
    deposit: Address,
    system: Arc<dyn SystemContract>,
    contract: Arc<dyn DepositContract>,
    tracker: StateTracker,
) -> Settled<()> {
    let (settler, settled) = signal::channel();

    tokio::spawn(async move {
        let outcome = wait_for_active(deposit, system.as_ref(), contract.as_ref()).await;
        match &outcome {
            Ok(()) => {
                tracker.observe(DepositState::Active);
                tracing::info!(deposit = %deposit, "Deposit is ACTIVE");
            }
            Err(e) => tracing::warn!(deposit = %deposit, error = %e, "Active state watcher failed"),
        }
        settler.settle(outcome);
    });

    settled
}

async fn wait_for_active(
    deposit: Address,
    system: &dyn SystemContract,
    contract: &dyn DepositContract,
) -> Result<()> {
    if contract.in_active().await? {
        return Ok(());
    }

    let funded = system.wait_for_funded_event(deposit).await?;
    tracing::debug!(deposit = %deposit, txid = %funded.txid, "Observed Funded event");
    Ok(())
}
