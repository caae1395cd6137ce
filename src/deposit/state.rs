//! Observed deposit state
//!
//! Reads of the contract state may come from lagging nodes. Within the
//! funding path the tracker only moves forward: once AWAITING_BTC_FUNDING_PROOF
//! has been seen, a later read of AWAITING_SIGNER_SETUP is stale and ignored.

use std::sync::Arc;

use tokio::sync::watch;

use crate::types::DepositState;

/// Position along the funding path; every state past it shares the top rank
fn funding_rank(state: DepositState) -> u8 {
    match state {
        DepositState::Start => 0,
        DepositState::AwaitingSignerSetup => 1,
        DepositState::AwaitingBtcFundingProof => 2,
        _ => 3,
    }
}

/// Last accepted observation of one deposit's state
#[derive(Debug, Clone)]
pub struct StateTracker {
    tx: Arc<watch::Sender<Option<DepositState>>>,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Record an observation and return the state now held. A stale
    /// funding-path read leaves the held state unchanged.
    pub fn observe(&self, state: DepositState) -> DepositState {
        let mut accepted = state;
        self.tx.send_if_modified(|current| match *current {
            Some(previous) if funding_rank(state) < funding_rank(previous) => {
                tracing::debug!(%previous, stale = %state, "Ignoring stale deposit state read");
                accepted = previous;
                false
            }
            Some(previous) if previous == state => false,
            _ => {
                *current = Some(state);
                true
            }
        });
        accepted
    }

    pub fn latest(&self) -> Option<DepositState> {
        *self.tx.borrow()
    }

    /// Receiver woken on every accepted change
    pub fn subscribe(&self) -> watch::Receiver<Option<DepositState>> {
        self.tx.subscribe()
    }
}
