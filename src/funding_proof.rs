//! Funding Proof Construction
//!
//! Turns a located funding transaction into the eight fields the deposit
//! contract's SPV verifier consumes. The Bitcoin client supplies the proof
//! material; this module decodes and sanity-checks it.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::chain::{BitcoinClient, FoundTransaction, SpvProofBundle};
use crate::common::error::{Result, TbtcError};
use crate::types::FundingProof;

/// Serialized block header length
pub const HEADER_LEN: usize = 80;

/// Merkle sibling length
pub const HASH_LEN: usize = 32;

/// Builds funding proofs from Bitcoin client data
#[derive(Clone)]
pub struct ProofBuilder {
    bitcoin: Arc<dyn BitcoinClient>,
}

impl ProofBuilder {
    pub fn new(bitcoin: Arc<dyn BitcoinClient>) -> Self {
        Self { bitcoin }
    }

    /// Proof that `transaction` is buried under `required_confirmations` blocks
    pub async fn construct_funding_proof(
        &self,
        transaction: &FoundTransaction,
        required_confirmations: u64,
    ) -> Result<FundingProof> {
        let bundle = self
            .bitcoin
            .get_spv_proof(&transaction.transaction_id, required_confirmations)
            .await?;

        let proof = funding_proof_from_bundle(transaction, &bundle)?;
        tracing::debug!(
            txid = %transaction.transaction_id,
            headers = proof.chain_headers.len() / HEADER_LEN,
            merkle_depth = proof.merkle_proof.len() / HASH_LEN,
            "Constructed funding proof"
        );
        Ok(proof)
    }
}

/// Decode and check an SPV bundle against the transaction it claims to prove
pub fn funding_proof_from_bundle(
    transaction: &FoundTransaction,
    bundle: &SpvProofBundle,
) -> Result<FundingProof> {
    let parsed = &bundle.parsed_transaction;
    let version = decode_field("version", &parsed.version)?;
    let tx_in_vector = decode_field("txInVector", &parsed.tx_in_vector)?;
    let tx_out_vector = decode_field("txOutVector", &parsed.tx_out_vector)?;
    let locktime = decode_field("locktime", &parsed.locktime)?;
    let merkle_proof = decode_field("merkleProof", &bundle.merkle_proof)?;
    let chain_headers = decode_field("chainHeaders", &bundle.chain_headers)?;

    if version.len() != 4 || locktime.len() != 4 {
        return Err(TbtcError::proof("version and locktime must be 4 bytes each"));
    }

    let txid = compute_txid(&version, &tx_in_vector, &tx_out_vector, &locktime);
    if !txid.eq_ignore_ascii_case(&transaction.transaction_id) {
        return Err(TbtcError::proof(format!(
            "proof transaction {} does not match funding transaction {}",
            txid, transaction.transaction_id
        )));
    }

    if chain_headers.is_empty() || chain_headers.len() % HEADER_LEN != 0 {
        return Err(TbtcError::proof(format!(
            "chain headers length {} is not a whole number of {}-byte headers",
            chain_headers.len(),
            HEADER_LEN
        )));
    }

    if merkle_proof.len() % HASH_LEN != 0 {
        return Err(TbtcError::proof(format!(
            "merkle proof length {} is not a whole number of {}-byte hashes",
            merkle_proof.len(),
            HASH_LEN
        )));
    }

    Ok(FundingProof {
        version,
        tx_in_vector,
        tx_out_vector,
        locktime,
        output_position: transaction.output_position,
        merkle_proof,
        tx_in_block_index: bundle.tx_in_block_index,
        chain_headers,
    })
}

/// Display-order txid of the legacy (non-witness) serialization
pub fn compute_txid(version: &[u8], tx_in_vector: &[u8], tx_out_vector: &[u8], locktime: &[u8]) -> String {
    let mut serialized =
        Vec::with_capacity(version.len() + tx_in_vector.len() + tx_out_vector.len() + locktime.len());
    serialized.extend_from_slice(version);
    serialized.extend_from_slice(tx_in_vector);
    serialized.extend_from_slice(tx_out_vector);
    serialized.extend_from_slice(locktime);

    let mut hash = double_sha256(&serialized);
    hash.reverse();
    hex::encode(hash)
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| TbtcError::proof(format!("{} is not valid hex: {}", name, e)))
}
