//! Per-market oracle price data

use serde::{Deserialize, Serialize};

use crate::numeric::{i64_string, u64_string};

/// A point-in-time oracle reading for one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OraclePriceData {
    /// Reference price, PRICE_PRECISION. Signed: some oracles publish
    /// negative spreads/rates through the same pipe.
    #[serde(with = "i64_string")]
    pub price: i64,
    /// Confidence interval around the price, PRICE_PRECISION.
    #[serde(with = "u64_string")]
    pub confidence: u64,
    /// Time-weighted average price, PRICE_PRECISION.
    #[serde(with = "i64_string")]
    pub twap: i64,
    /// Slot the reading was published for.
    pub slot: u64,
}

impl OraclePriceData {
    pub fn new(price: i64, confidence: u64, twap: i64, slot: u64) -> Self {
        Self {
            price,
            confidence,
            twap,
            slot,
        }
    }
}
