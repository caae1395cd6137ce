//! Auto-submit pipeline
//!
//! Watches the funding address for the lot-size payment, waits for the
//! confirmations the system requires, then submits the funding proof. The
//! three stages run strictly in order in one spawned task; each settles its
//! own cell, and a failure settles every remaining cell with the same error.

use std::sync::Arc;

use tokio::sync::watch;

use super::Deposit;
use crate::chain::{FoundTransaction, TransactionReceipt};
use crate::common::error::{Result, TbtcError};
use crate::common::logging::{log_deposit_event, EventCategory};
use crate::funding_proof::ProofBuilder;
use crate::signal::{self, Settled, Settler};

/// Stage the pipeline is in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSubmitStage {
    LocatingFunding,
    WaitingConfirmations,
    SubmittingProof,
    Done,
    Failed(String),
}

/// A funding transaction with the confirmation depth it reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingConfirmations {
    pub transaction: FoundTransaction,
    pub required_confirmations: u64,
}

/// Observable results of a deposit's pipeline; clones share the same pipeline
#[derive(Debug, Clone)]
pub struct AutoSubmitHandle {
    pub funding_transaction: Settled<FoundTransaction>,
    pub funding_confirmations: Settled<FundingConfirmations>,
    pub proof_transaction: Settled<TransactionReceipt>,
    stage: watch::Receiver<AutoSubmitStage>,
}

impl AutoSubmitHandle {
    pub fn stage(&self) -> AutoSubmitStage {
        self.stage.borrow().clone()
    }

    pub fn stage_updates(&self) -> watch::Receiver<AutoSubmitStage> {
        self.stage.clone()
    }

    /// Whether both handles belong to the same pipeline run
    pub fn same_pipeline(&self, other: &Self) -> bool {
        self.proof_transaction.same_channel(&other.proof_transaction)
    }
}

impl Deposit {
    /// Start the pipeline, or return the handle of the one already running
    pub fn auto_submit(self: &Arc<Self>) -> AutoSubmitHandle {
        self.auto_submit
            .get_or_init(|| launch(Arc::clone(self)))
            .clone()
    }
}

struct Settlers {
    funding_transaction: Settler<FoundTransaction>,
    funding_confirmations: Settler<FundingConfirmations>,
    proof_transaction: Settler<TransactionReceipt>,
    stage: watch::Sender<AutoSubmitStage>,
}

fn launch(deposit: Arc<Deposit>) -> AutoSubmitHandle {
    let (funding_transaction, funding_transaction_rx) = signal::channel();
    let (funding_confirmations, funding_confirmations_rx) = signal::channel();
    let (proof_transaction, proof_transaction_rx) = signal::channel();
    let (stage, stage_rx) = watch::channel(AutoSubmitStage::LocatingFunding);

    tracing::info!(deposit = %deposit.address(), "Starting auto-submit");
    tokio::spawn(run(
        deposit,
        Settlers {
            funding_transaction,
            funding_confirmations,
            proof_transaction,
            stage,
        },
    ));

    AutoSubmitHandle {
        funding_transaction: funding_transaction_rx,
        funding_confirmations: funding_confirmations_rx,
        proof_transaction: proof_transaction_rx,
        stage: stage_rx,
    }
}

async fn run(deposit: Arc<Deposit>, settlers: Settlers) {
    let address = deposit.address().to_string();

    // stage tag moves before the matching cell settles
    let transaction = match locate_funding_transaction(&deposit).await {
        Ok(transaction) => {
            settlers.stage.send_replace(AutoSubmitStage::WaitingConfirmations);
            settlers.funding_transaction.settle(Ok(transaction.clone()));
            transaction
        }
        Err(e) => {
            fail(&settlers, &address, e);
            return;
        }
    };

    let confirmations = match wait_for_confirmations(&deposit, transaction).await {
        Ok(confirmations) => {
            settlers.stage.send_replace(AutoSubmitStage::SubmittingProof);
            settlers.funding_confirmations.settle(Ok(confirmations.clone()));
            confirmations
        }
        Err(e) => {
            fail(&settlers, &address, e);
            return;
        }
    };

    match submit_funding_proof(&deposit, &confirmations).await {
        Ok(receipt) => {
            settlers.stage.send_replace(AutoSubmitStage::Done);
            settlers.proof_transaction.settle(Ok(receipt));
        }
        Err(e) => fail(&settlers, &address, e),
    }
}

/// Settle every stage not yet settled with `error`
fn fail(settlers: &Settlers, deposit: &str, error: TbtcError) {
    log_deposit_event(
        EventCategory::Proof,
        "auto_submit_failed",
        deposit,
        None,
        Some((error.error_code(), &error.to_string())),
    );

    settlers.stage.send_replace(AutoSubmitStage::Failed(error.to_string()));
    settlers.funding_transaction.settle(Err(error.clone()));
    settlers.funding_confirmations.settle(Err(error.clone()));
    settlers.proof_transaction.settle(Err(error));
}

async fn locate_funding_transaction(deposit: &Deposit) -> Result<FoundTransaction> {
    let address = deposit.bitcoin_address().await?;
    let lot_size = deposit.lot_size().await?;

    tracing::info!(
        deposit = %deposit.address(),
        bitcoin_address = %address,
        lot_size,
        "Watching for funding transaction"
    );
    let transaction = deposit
        .context
        .bitcoin
        .find_or_wait_for(&address, lot_size)
        .await?;

    if transaction.value != lot_size {
        return Err(TbtcError::proof(format!(
            "funding transaction {} pays {} satoshis; lot size is {}",
            transaction.transaction_id, transaction.value, lot_size
        )));
    }

    log_deposit_event(
        EventCategory::Funding,
        "funding_transaction_found",
        &deposit.address().to_string(),
        Some(lot_size),
        None,
    );
    Ok(transaction)
}

async fn wait_for_confirmations(
    deposit: &Deposit,
    transaction: FoundTransaction,
) -> Result<FundingConfirmations> {
    let required_confirmations = deposit
        .context
        .contracts
        .system
        .get_tx_proof_difficulty_factor()
        .await?;

    tracing::info!(
        deposit = %deposit.address(),
        txid = %transaction.transaction_id,
        required_confirmations,
        "Waiting for funding confirmations"
    );
    deposit
        .context
        .bitcoin
        .wait_for_confirmations(&transaction, required_confirmations)
        .await?;

    Ok(FundingConfirmations {
        transaction,
        required_confirmations,
    })
}

async fn submit_funding_proof(
    deposit: &Deposit,
    confirmations: &FundingConfirmations,
) -> Result<TransactionReceipt> {
    let proof = ProofBuilder::new(Arc::clone(&deposit.context.bitcoin))
        .construct_funding_proof(&confirmations.transaction, confirmations.required_confirmations)
        .await?;

    tracing::info!(
        deposit = %deposit.address(),
        txid = %confirmations.transaction.transaction_id,
        "Submitting funding proof"
    );
    let receipt = deposit.contract.provide_btc_funding_proof(&proof).await?;

    log_deposit_event(
        EventCategory::Proof,
        "funding_proof_submitted",
        &deposit.address().to_string(),
        Some(deposit.lot_size().await?),
        None,
    );
    Ok(receipt)
}
