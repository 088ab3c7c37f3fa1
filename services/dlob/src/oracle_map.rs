//! Per-market oracle view
//!
//! Holds the most recent oracle reading for each market, fed by the market
//! poller loop. Absent markets are a soft miss.

use dashmap::DashMap;
use types::market::MarketId;
use types::oracle::OraclePriceData;

/// Concurrent map `market -> latest oracle reading`.
#[derive(Debug, Default)]
pub struct OracleMap {
    prices: DashMap<MarketId, OraclePriceData>,
}

impl OracleMap {
    pub fn new() -> Self {
        Self {
            prices: DashMap::new(),
        }
    }

    /// Store a reading, keeping the newer of (stored, incoming) by slot.
    pub fn update(&self, market: MarketId, data: OraclePriceData) {
        self.prices
            .entry(market)
            .and_modify(|existing| {
                if data.slot >= existing.slot {
                    *existing = data;
                }
            })
            .or_insert(data);
    }

    pub fn get(&self, market: MarketId) -> Option<OraclePriceData> {
        self.prices.get(&market).map(|entry| *entry.value())
    }

    /// All readings, for the raw order dump.
    pub fn all(&self) -> Vec<(MarketId, OraclePriceData)> {
        self.prices
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
