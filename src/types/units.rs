//! Unit Conversion Utilities
//!
//! Lot sizes are denominated in satoshis; TBTC has 18 decimals, so one
//! satoshi is 10^10 TBTC base units.

use alloy_primitives::U256;

/// Satoshis per Bitcoin
pub const SATS_PER_BTC: u64 = 100_000_000;

/// TBTC base units per satoshi (10^10)
pub const SATOSHI_MULTIPLIER: u64 = 10_000_000_000;

/// TBTC token decimals
pub const TBTC_DECIMALS: u32 = 18;

/// Satoshis to TBTC base units
pub fn satoshis_to_tbtc(sats: U256) -> U256 {
    sats * U256::from(SATOSHI_MULTIPLIER)
}

/// TBTC base units to whole tokens, truncating
pub fn tbtc_to_whole_tokens(amount: U256) -> U256 {
    amount / U256::from(10u64).pow(U256::from(TBTC_DECIMALS))
}

/// Satoshis as a fixed 8-decimal BTC amount, e.g. 100000 -> "0.00100000"
pub fn sats_to_btc_string(sats: u64) -> String {
    format!("{}.{:08}", sats / SATS_PER_BTC, sats % SATS_PER_BTC)
}
