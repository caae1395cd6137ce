//! Single-settlement cells
//!
//! A watcher or pipeline stage resolves exactly once, and any number of
//! callers may await the outcome, before or after it settles. Built on
//! `tokio::sync::watch` holding `None` until settled.

use tokio::sync::watch;

use crate::common::error::{Result, TbtcError};

type Slot<T> = Option<Result<T>>;

/// Write side; the first `settle` wins
#[derive(Debug)]
pub struct Settler<T> {
    tx: watch::Sender<Slot<T>>,
}

/// Read side, cheap to clone
#[derive(Debug, Clone)]
pub struct Settled<T> {
    rx: watch::Receiver<Slot<T>>,
}

/// A fresh unsettled cell
pub fn channel<T>() -> (Settler<T>, Settled<T>) {
    let (tx, rx) = watch::channel(None);
    (Settler { tx }, Settled { rx })
}

impl<T> Settler<T> {
    /// Settle the cell. Returns false if it was already settled.
    pub fn settle(&self, outcome: Result<T>) -> bool {
        self.tx.send_if_modified(move |slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }
}

impl<T: Clone> Settled<T> {
    /// Wait for the outcome. Fails with a state error if the settling task
    /// went away without settling.
    pub async fn wait(&self) -> Result<T> {
        let mut rx = self.rx.clone();
        let slot = rx
            .wait_for(Option::is_some)
            .await
            .map(|slot| slot.clone())
            .map_err(|_| TbtcError::state("background task ended before settling"))?;

        slot.unwrap_or_else(|| Err(TbtcError::state("background task ended before settling")))
    }

    /// The outcome, if already settled
    pub fn peek(&self) -> Option<Result<T>> {
        self.rx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Whether both handles observe the same cell
    pub fn same_channel(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }
}
