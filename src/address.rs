//! Bitcoin Address Codec
//!
//! The funding address of a deposit is the P2WPKH address of the signer
//! group's compressed public key. Redeemer addresses go the other way, into
//! the length-prefixed output script the deposit contract stores.

use std::str::FromStr;

use alloy_primitives::Bytes;
use bitcoin::{Address, CompressedPublicKey, Network};

use crate::common::error::{Result, TbtcError};
use crate::types::PublicKeyPoint;

/// P2WPKH address for the signer group key on `network`
pub fn public_key_point_to_p2wpkh_address(point: &PublicKeyPoint, network: Network) -> Result<String> {
    let public_key = CompressedPublicKey(point.to_public_key()?);
    Ok(Address::p2wpkh(&public_key, network).to_string())
}

/// scriptPubKey paying `address`; the address must belong to `network`
pub fn output_script_from_address(address: &str, network: Network) -> Result<Vec<u8>> {
    let unchecked = Address::from_str(address)
        .map_err(|e| TbtcError::validation(format!("invalid redeemer address {}: {}", address, e)))?;
    let checked = unchecked.require_network(network).map_err(|e| {
        TbtcError::validation(format!("redeemer address {} is not valid on {}: {}", address, network, e))
    })?;

    Ok(checked.script_pubkey().to_bytes())
}

/// Output script prefixed with its one-byte length, as `requestRedemption` expects
pub fn redeemer_output_script(address: &str, network: Network) -> Result<Bytes> {
    let script = output_script_from_address(address, network)?;
    if script.len() > 0xfc {
        return Err(TbtcError::validation(format!(
            "output script for {} is too long ({} bytes)",
            address,
            script.len()
        )));
    }

    let mut prefixed = Vec::with_capacity(script.len() + 1);
    prefixed.push(script.len() as u8);
    prefixed.extend_from_slice(&script);
    Ok(Bytes::from(prefixed))
}
