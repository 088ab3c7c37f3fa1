//! Virtual AMM liquidity generator
//!
//! Perp markets carry a constant-product virtual AMM whose curve contributes
//! synthetic liquidity to L2 views. From the reserve state we derive a
//! reserve price, spread it into best bid/ask quotes, and split the open
//! liquidity on each side into up to `num_orders` evenly sized levels walking
//! from the best quote out to the full spread. All math is integer with
//! u128 intermediates.

use types::market::MarketId;
use types::numeric::PERCENTAGE_PRECISION;

use crate::codec::MarketAccount;
use crate::venues::{L2Generator, PriceLevel};
use crate::engine::book::BookSide;

/// Peg multiplier scale: 1.0 == 1_000.
pub const PEG_PRECISION: u128 = 1_000;

/// Price scale, as u128 for the reserve math.
const PRICE_PRECISION_U128: u128 = types::numeric::PRICE_PRECISION as u128;

/// Reserve state of one perp market's virtual AMM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VammState {
    pub base_asset_reserve: u128,
    pub quote_asset_reserve: u128,
    pub peg_multiplier: u128,
    /// Quoted spread, PERCENTAGE_PRECISION.
    pub base_spread: u32,
    pub max_base_asset_reserve: u128,
    pub min_base_asset_reserve: u128,
}

impl From<&MarketAccount> for VammState {
    fn from(market: &MarketAccount) -> Self {
        Self {
            base_asset_reserve: market.base_asset_reserve,
            quote_asset_reserve: market.quote_asset_reserve,
            peg_multiplier: market.peg_multiplier,
            base_spread: market.base_spread,
            max_base_asset_reserve: market.max_base_asset_reserve,
            min_base_asset_reserve: market.min_base_asset_reserve,
        }
    }
}

impl VammState {
    /// Mid price implied by the reserves, PRICE_PRECISION.
    pub fn reserve_price(&self) -> Option<u64> {
        if self.base_asset_reserve == 0 {
            return None;
        }
        let wide = self
            .quote_asset_reserve
            .checked_mul(self.peg_multiplier)?
            .checked_mul(PRICE_PRECISION_U128)?
            / (self.base_asset_reserve * PEG_PRECISION);
        u64::try_from(wide).ok()
    }

    /// Best quote on `side`: reserve price adjusted by half the spread.
    pub fn best_quote(&self, side: BookSide) -> Option<u64> {
        let mid = self.reserve_price()? as u128;
        let half_spread = mid * (self.base_spread as u128) / (2 * PERCENTAGE_PRECISION as u128);
        let quote = match side {
            BookSide::Bid => mid.checked_sub(half_spread)?,
            BookSide::Ask => mid.checked_add(half_spread)?,
        };
        u64::try_from(quote).ok()
    }

    /// Base liquidity the curve can supply on `side`, BASE_PRECISION.
    pub fn open_liquidity(&self, side: BookSide) -> u64 {
        let wide = match side {
            BookSide::Bid => self
                .base_asset_reserve
                .saturating_sub(self.min_base_asset_reserve),
            BookSide::Ask => self
                .max_base_asset_reserve
                .saturating_sub(self.base_asset_reserve),
        };
        u64::try_from(wide).unwrap_or(u64::MAX)
    }

    /// Split one side's open liquidity into up to `num_orders` levels.
    ///
    /// Level prices walk linearly from the best quote out to the far edge of
    /// the spread; sizes are equal per level with the remainder on the first.
    pub fn levels(&self, side: BookSide, num_orders: usize) -> Vec<PriceLevel> {
        let (Some(best), Some(mid)) = (self.best_quote(side), self.reserve_price()) else {
            return Vec::new();
        };
        let open = self.open_liquidity(side);
        if num_orders == 0 || open == 0 {
            return Vec::new();
        }

        let count = (num_orders as u64).min(open).max(1) as usize;
        let size = open / count as u64;
        let remainder = open % count as u64;

        // Far edge: a full spread beyond the best quote.
        let full_spread =
            (mid as u128) * (self.base_spread as u128) / (PERCENTAGE_PRECISION as u128);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let step = full_spread * (i as u128) / (count as u128);
            let price = match side {
                BookSide::Bid => (best as u128).saturating_sub(step),
                BookSide::Ask => (best as u128).saturating_add(step),
            };
            let Ok(price) = u64::try_from(price) else {
                continue;
            };
            if price == 0 {
                continue;
            }
            let level_size = if i == 0 { size + remainder } else { size };
            out.push(PriceLevel {
                price,
                size: level_size,
            });
        }
        out
    }
}

/// Latest vAMM state per perp market, fed by the market poller.
#[derive(Debug, Default)]
pub struct VammMap {
    states: dashmap::DashMap<MarketId, VammState>,
}

impl VammMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, market: MarketId, state: VammState) {
        self.states.insert(market, state);
    }

    pub fn get(&self, market: MarketId) -> Option<VammState> {
        self.states.get(&market).map(|entry| *entry.value())
    }
}

/// [`L2Generator`] view over a vAMM state, bounded to `num_orders` levels.
#[derive(Debug, Clone)]
pub struct VammGenerator {
    pub market: MarketId,
    state: VammState,
    num_orders: usize,
}

impl VammGenerator {
    pub fn new(market: MarketId, state: VammState, num_orders: usize) -> Self {
        Self {
            market,
            state,
            num_orders,
        }
    }
}

impl L2Generator for VammGenerator {
    fn source(&self) -> &'static str {
        "vamm"
    }

    fn levels(&self, side: BookSide) -> Vec<PriceLevel> {
        self.state.levels(side, self.num_orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::PRICE_PRECISION;

    /// Reserves implying a 100.0 mid with symmetric 0.1% spread.
    fn state() -> VammState {
        VammState {
            base_asset_reserve: 1_000_000_000_000,
            quote_asset_reserve: 1_000_000_000_000,
            peg_multiplier: 100 * PEG_PRECISION,
            base_spread: 1_000, // 0.1% of PERCENTAGE_PRECISION
            max_base_asset_reserve: 1_000_000_000_000 + 50_000_000_000,
            min_base_asset_reserve: 1_000_000_000_000 - 50_000_000_000,
        }
    }

    #[test]
    fn test_reserve_price() {
        assert_eq!(state().reserve_price(), Some(100 * PRICE_PRECISION));
    }

    #[test]
    fn test_quotes_straddle_mid() {
        let s = state();
        let bid = s.best_quote(BookSide::Bid).unwrap();
        let ask = s.best_quote(BookSide::Ask).unwrap();
        assert!(bid < 100 * PRICE_PRECISION);
        assert!(ask > 100 * PRICE_PRECISION);
        assert_eq!(100 * PRICE_PRECISION - bid, ask - 100 * PRICE_PRECISION);
    }

    #[test]
    fn test_levels_bounded_and_ordered() {
        let s = state();
        let bids = s.levels(BookSide::Bid, 5);
        assert_eq!(bids.len(), 5);
        // Walking away from the mid: descending prices
        for pair in bids.windows(2) {
            assert!(pair[0].price > pair[1].price);
        }
        // All liquidity accounted for
        let total: u64 = bids.iter().map(|l| l.size).sum();
        assert_eq!(total, s.open_liquidity(BookSide::Bid));
    }

    #[test]
    fn test_no_levels_without_reserves() {
        let mut s = state();
        s.base_asset_reserve = 0;
        assert!(s.levels(BookSide::Bid, 5).is_empty());
        assert_eq!(s.reserve_price(), None);
    }

    #[test]
    fn test_zero_num_orders() {
        assert!(state().levels(BookSide::Ask, 0).is_empty());
    }
}
