//! Market identity and static market configuration
//!
//! A market is `(MarketType, market_index)`. The set of markets is static
//! per process: loaded once at startup (from decoded market accounts or a
//! built-in table in tests) and never mutated afterwards.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Perp or spot market class.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Perp,
    Spot,
}

impl MarketType {
    /// Parse from the query-string spelling (`perp` / `spot`, any case).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "perp" => Some(MarketType::Perp),
            "spot" => Some(MarketType::Spot),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Perp => "perp",
            MarketType::Spot => "spot",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical market key: type + index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MarketId {
    #[serde(rename = "marketType")]
    pub market_type: MarketType,
    #[serde(rename = "marketIndex")]
    pub market_index: u16,
}

impl MarketId {
    pub fn perp(market_index: u16) -> Self {
        Self {
            market_type: MarketType::Perp,
            market_index,
        }
    }

    pub fn spot(market_index: u16) -> Self {
        Self {
            market_type: MarketType::Spot,
            market_index,
        }
    }

    pub fn is_perp(&self) -> bool {
        self.market_type == MarketType::Perp
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.market_type, self.market_index)
    }
}

/// Static per-market configuration.
///
/// Spot markets may advertise external venue addresses; perp markets carry
/// the AMM state needed by the synthetic liquidity generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Human name, e.g. `SOL-PERP` or `SOL` (spot). Matched case-insensitively.
    pub name: String,
    pub market_id: MarketId,
    /// On-chain market account.
    pub market_account: Pubkey,
    /// Oracle account for this market.
    pub oracle: Pubkey,
    /// Phoenix market address, spot only.
    pub phoenix_market: Option<Pubkey>,
    /// Serum market address, spot only.
    pub serum_market: Option<Pubkey>,
}

/// The static set of markets served by this process.
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    markets: Vec<MarketConfig>,
}

impl MarketRegistry {
    pub fn new(markets: Vec<MarketConfig>) -> Self {
        Self { markets }
    }

    pub fn all(&self) -> &[MarketConfig] {
        &self.markets
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn get(&self, id: MarketId) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.market_id == id)
    }

    /// Case-insensitive lookup by market name.
    pub fn by_name(&self, name: &str) -> Option<&MarketConfig> {
        self.markets
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn market_ids(&self) -> impl Iterator<Item = MarketId> + '_ {
        self.markets.iter().map(|m| m.market_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MarketRegistry {
        MarketRegistry::new(vec![
            MarketConfig {
                name: "SOL-PERP".to_string(),
                market_id: MarketId::perp(0),
                market_account: Pubkey::new_unique(),
                oracle: Pubkey::new_unique(),
                phoenix_market: None,
                serum_market: None,
            },
            MarketConfig {
                name: "SOL".to_string(),
                market_id: MarketId::spot(1),
                market_account: Pubkey::new_unique(),
                oracle: Pubkey::new_unique(),
                phoenix_market: Some(Pubkey::new_unique()),
                serum_market: None,
            },
        ])
    }

    #[test]
    fn test_market_type_parse() {
        assert_eq!(MarketType::parse("perp"), Some(MarketType::Perp));
        assert_eq!(MarketType::parse("SPOT"), Some(MarketType::Spot));
        assert_eq!(MarketType::parse("swap"), None);
    }

    #[test]
    fn test_lookup_by_name_case_insensitive() {
        let reg = registry();
        assert_eq!(
            reg.by_name("sol-perp").map(|m| m.market_id),
            Some(MarketId::perp(0))
        );
        assert!(reg.by_name("BTC-PERP").is_none());
    }

    #[test]
    fn test_lookup_by_id() {
        let reg = registry();
        let spot = reg.get(MarketId::spot(1)).unwrap();
        assert!(spot.phoenix_market.is_some());
        assert!(reg.get(MarketId::perp(7)).is_none());
    }

    #[test]
    fn test_market_id_display() {
        assert_eq!(MarketId::perp(0).to_string(), "perp-0");
        assert_eq!(MarketId::spot(3).to_string(), "spot-3");
    }
}
