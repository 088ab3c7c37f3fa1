//! Per-market sorted book sides
//!
//! A `MarketBook` is rebuilt wholesale on every tick from the order index:
//! each live order gets an *effective price at the tick slot* — its limit
//! price once resting, the linear auction interpolation while its posting
//! auction runs, or an oracle-relative price for floating orders — and is
//! deposited into the bid or ask side. Sides are fully sorted with a stable
//! tiebreak (ascending posting slot, then ascending order id) so equal-priced
//! orders keep time priority across rebuilds.
//!
//! Trigger orders stay out of the book until their condition is satisfied
//! against the oracle. Expired and `Init` orders never enter.

use serde::Serialize;
use types::market::{MarketId, MarketType};
use types::numeric::interpolate_i64;
use types::oracle::OraclePriceData;
use types::order::{Direction, Order, OrderType};
use types::Pubkey;

/// Bid or ask side of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    Bid,
    Ask,
}

impl BookSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bid" | "bids" => Some(BookSide::Bid),
            "ask" | "asks" => Some(BookSide::Ask),
            _ => None,
        }
    }

    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Long => BookSide::Bid,
            Direction::Short => BookSide::Ask,
        }
    }
}

/// One order deposited into a book side.
#[derive(Debug, Clone, Copy)]
pub struct BookOrder {
    /// Owning user account.
    pub user: Pubkey,
    pub order: Order,
    /// Price at the snapshot slot, PRICE_PRECISION.
    pub effective_price: u64,
    /// Post-auction limit order on the passive side of the oracle; the only
    /// entries eligible as makers.
    pub is_resting_limit: bool,
}

impl BookOrder {
    /// Unfilled base size.
    pub fn size(&self) -> u64 {
        self.order.base_asset_amount_unfilled()
    }
}

/// Why an order was left out of the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Not an open order.
    NotOpen,
    /// `max_ts` elapsed.
    Expired,
    /// Trigger condition not yet satisfied (or no oracle to judge it).
    Untriggered,
    /// Fully filled remainder.
    NoSize,
    /// No price derivable (oracle-relative order without an oracle).
    Unpriced,
}

/// Compute the order's effective price at `slot`, or why it has none.
///
/// During the posting auction the price walks linearly from
/// `auction_start_price` to `auction_end_price`; oracle orders are priced
/// relative to the oracle both during and after the auction.
pub fn effective_price(
    order: &Order,
    oracle: Option<&OraclePriceData>,
    slot: u64,
) -> Result<u64, Exclusion> {
    let oracle_price = oracle.map(|o| o.price);

    if !order.is_auction_complete(slot) {
        let elapsed = slot.saturating_sub(order.slot);
        let raw = interpolate_i64(
            order.auction_start_price,
            order.auction_end_price,
            elapsed,
            order.auction_duration as u64,
        );
        let priced = match order.order_type {
            // Oracle auctions quote offsets from the oracle price.
            OrderType::Oracle => oracle_price.ok_or(Exclusion::Unpriced)?.saturating_add(raw),
            _ => raw,
        };
        return u64::try_from(priced).map_err(|_| Exclusion::Unpriced);
    }

    match order.order_type {
        OrderType::Oracle => {
            let base = oracle_price.ok_or(Exclusion::Unpriced)?;
            u64::try_from(base.saturating_add(order.oracle_price_offset as i64))
                .map_err(|_| Exclusion::Unpriced)
        }
        OrderType::Market | OrderType::TriggerMarket => {
            // Past its auction a market order keeps quoting the auction end
            // price until filled or pruned.
            if order.auction_duration > 0 {
                u64::try_from(order.auction_end_price).map_err(|_| Exclusion::Unpriced)
            } else if order.price > 0 {
                Ok(order.price)
            } else {
                Err(Exclusion::Unpriced)
            }
        }
        OrderType::Limit | OrderType::TriggerLimit => {
            if order.price > 0 {
                Ok(order.price)
            } else {
                Err(Exclusion::Unpriced)
            }
        }
    }
}

/// Whether the order counts as a resting maker at `slot`.
///
/// Resting means: a limit-priced order whose posting auction has elapsed and
/// whose effective price sits strictly on the passive side of the oracle
/// (bid at or below, ask at or above) for perp markets. Without an oracle
/// reading the passivity check is vacuous.
fn is_resting_limit(
    order: &Order,
    effective: u64,
    oracle: Option<&OraclePriceData>,
    slot: u64,
) -> bool {
    if !order.is_auction_complete(slot) {
        return false;
    }
    let limit_like = matches!(
        order.order_type,
        OrderType::Limit | OrderType::TriggerLimit | OrderType::Oracle
    );
    if !limit_like || !order.has_limit_price() {
        return false;
    }
    match (order.market_type == MarketType::Perp, oracle) {
        (true, Some(data)) => match order.direction {
            Direction::Long => (effective as i128) <= data.price as i128,
            Direction::Short => (effective as i128) >= data.price as i128,
        },
        _ => true,
    }
}

/// Classify an open order for the book, or explain its exclusion.
pub fn classify_order(
    user: Pubkey,
    order: &Order,
    oracle: Option<&OraclePriceData>,
    slot: u64,
    now: i64,
) -> Result<BookOrder, Exclusion> {
    if !order.is_open() {
        return Err(Exclusion::NotOpen);
    }
    if order.is_expired(now) {
        return Err(Exclusion::Expired);
    }
    if order.base_asset_amount_unfilled() == 0 {
        return Err(Exclusion::NoSize);
    }
    if order.must_be_triggered() && !order.is_triggered() {
        let oracle_price = oracle.map(|o| o.price).ok_or(Exclusion::Untriggered)?;
        if !order
            .trigger_condition
            .is_satisfied(order.trigger_price, oracle_price)
        {
            return Err(Exclusion::Untriggered);
        }
        // A satisfied trigger-market order still has no resting price.
        if order.order_type == OrderType::TriggerMarket && order.auction_duration == 0 {
            return Err(Exclusion::Unpriced);
        }
    }

    let effective = effective_price(order, oracle, slot)?;
    Ok(BookOrder {
        user,
        order: *order,
        effective_price: effective,
        is_resting_limit: is_resting_limit(order, effective, oracle, slot),
    })
}

/// Fully sorted two-sided book for one market at one slot.
#[derive(Debug, Clone)]
pub struct MarketBook {
    pub market: MarketId,
    /// Slot the book was built against.
    pub slot: u64,
    /// Oracle reading used for pricing, if any.
    pub oracle: Option<OraclePriceData>,
    bids: Vec<BookOrder>,
    asks: Vec<BookOrder>,
}

impl MarketBook {
    pub fn new(market: MarketId, slot: u64, oracle: Option<OraclePriceData>) -> Self {
        Self {
            market,
            slot,
            oracle,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    /// Deposit a classified order on its side. Call [`seal`](Self::seal)
    /// after the last insert.
    pub fn insert(&mut self, entry: BookOrder) {
        match BookSide::from_direction(entry.order.direction) {
            BookSide::Bid => self.bids.push(entry),
            BookSide::Ask => self.asks.push(entry),
        }
    }

    /// Sort both sides: bids descending, asks ascending, ties broken by
    /// ascending posting slot then ascending order id.
    pub fn seal(&mut self) {
        self.bids.sort_unstable_by(|a, b| {
            b.effective_price
                .cmp(&a.effective_price)
                .then(a.order.slot.cmp(&b.order.slot))
                .then(a.order.order_id.cmp(&b.order.order_id))
        });
        self.asks.sort_unstable_by(|a, b| {
            a.effective_price
                .cmp(&b.effective_price)
                .then(a.order.slot.cmp(&b.order.slot))
                .then(a.order.order_id.cmp(&b.order.order_id))
        });
    }

    /// Best-first bid entries.
    pub fn bids(&self) -> impl Iterator<Item = &BookOrder> {
        self.bids.iter()
    }

    /// Best-first ask entries.
    pub fn asks(&self) -> impl Iterator<Item = &BookOrder> {
        self.asks.iter()
    }

    pub fn side(&self, side: BookSide) -> impl Iterator<Item = &BookOrder> {
        match side {
            BookSide::Bid => self.bids.iter(),
            BookSide::Ask => self.asks.iter(),
        }
    }

    /// Maker-eligible bid entries, best first.
    pub fn resting_limit_bids(&self) -> impl Iterator<Item = &BookOrder> {
        self.bids.iter().filter(|o| o.is_resting_limit)
    }

    /// Maker-eligible ask entries, best first.
    pub fn resting_limit_asks(&self) -> impl Iterator<Item = &BookOrder> {
        self.asks.iter().filter(|o| o.is_resting_limit)
    }

    pub fn resting_side(&self, side: BookSide) -> Box<dyn Iterator<Item = &BookOrder> + '_> {
        match side {
            BookSide::Bid => Box::new(self.resting_limit_bids()),
            BookSide::Ask => Box::new(self.resting_limit_asks()),
        }
    }

    pub fn best_bid(&self) -> Option<u64> {
        self.bids.first().map(|o| o.effective_price)
    }

    pub fn best_ask(&self) -> Option<u64> {
        self.asks.first().map(|o| o.effective_price)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::market::MarketType;
    use types::numeric::PRICE_PRECISION;
    use types::order::{OrderStatus, OrderTriggerCondition};

    fn oracle(price: u64) -> OraclePriceData {
        OraclePriceData::new(price as i64, 1_000, price as i64, 50)
    }

    fn limit_order(direction: Direction, price: u64, slot: u64, order_id: u32) -> Order {
        Order {
            status: OrderStatus::Open,
            order_type: OrderType::Limit,
            direction,
            price,
            base_asset_amount: 1_000_000_000,
            slot,
            order_id,
            market_type: MarketType::Perp,
            ..Order::default()
        }
    }

    #[test]
    fn test_resting_limit_price() {
        let order = limit_order(Direction::Long, 99 * PRICE_PRECISION, 10, 1);
        let price = effective_price(&order, Some(&oracle(100 * PRICE_PRECISION)), 100).unwrap();
        assert_eq!(price, 99 * PRICE_PRECISION);
    }

    #[test]
    fn test_auction_interpolation() {
        // Posted at slot 1000, 110 -> 100 over 10 slots; slot 1005 = 105
        let mut order = limit_order(Direction::Long, 0, 1000, 1);
        order.order_type = OrderType::Market;
        order.auction_start_price = 110 * PRICE_PRECISION as i64;
        order.auction_end_price = 100 * PRICE_PRECISION as i64;
        order.auction_duration = 10;

        let price = effective_price(&order, None, 1005).unwrap();
        assert_eq!(price, 105 * PRICE_PRECISION);

        // Past the auction the end price holds
        let price = effective_price(&order, None, 1010).unwrap();
        assert_eq!(price, 100 * PRICE_PRECISION);
    }

    #[test]
    fn test_oracle_offset_price() {
        let mut order = limit_order(Direction::Short, 0, 10, 1);
        order.order_type = OrderType::Oracle;
        order.oracle_price_offset = 2 * PRICE_PRECISION as i32;

        let price = effective_price(&order, Some(&oracle(100 * PRICE_PRECISION)), 100).unwrap();
        assert_eq!(price, 102 * PRICE_PRECISION);

        assert_eq!(
            effective_price(&order, None, 100),
            Err(Exclusion::Unpriced)
        );
    }

    #[test]
    fn test_classify_skips_untriggered() {
        let mut order = limit_order(Direction::Long, 95 * PRICE_PRECISION, 10, 1);
        order.order_type = OrderType::TriggerLimit;
        order.trigger_price = 90 * PRICE_PRECISION;
        order.trigger_condition = OrderTriggerCondition::Below;

        let user = Pubkey::new_unique();
        // Oracle above trigger: stays out
        let result = classify_order(user, &order, Some(&oracle(100 * PRICE_PRECISION)), 100, 0);
        assert_eq!(result.unwrap_err(), Exclusion::Untriggered);

        // Oracle below trigger: rests at its limit price
        let entry = classify_order(user, &order, Some(&oracle(89 * PRICE_PRECISION)), 100, 0).unwrap();
        assert_eq!(entry.effective_price, 95 * PRICE_PRECISION);
    }

    #[test]
    fn test_classify_skips_expired_and_filled() {
        let user = Pubkey::new_unique();
        let mut order = limit_order(Direction::Long, 10, 10, 1);
        order.max_ts = 100;
        assert_eq!(
            classify_order(user, &order, None, 50, 101).unwrap_err(),
            Exclusion::Expired
        );

        let mut order = limit_order(Direction::Long, 10, 10, 1);
        order.base_asset_amount_filled = order.base_asset_amount;
        assert_eq!(
            classify_order(user, &order, None, 50, 0).unwrap_err(),
            Exclusion::NoSize
        );
    }

    #[test]
    fn test_side_sorting_and_tiebreak() {
        let mut book = MarketBook::new(MarketId::perp(0), 100, None);
        let user = Pubkey::new_unique();

        for (price, slot, order_id) in [(101u64, 5u64, 2u32), (103, 9, 1), (101, 3, 9), (102, 1, 1)]
        {
            let order = limit_order(Direction::Long, price, slot, order_id);
            book.insert(classify_order(user, &order, None, 100, 0).unwrap());
        }
        book.seal();

        let prices: Vec<u64> = book.bids().map(|o| o.effective_price).collect();
        assert_eq!(prices, vec![103, 102, 101, 101]);

        // Equal-priced bids: earlier posting slot first
        let tied: Vec<u64> = book
            .bids()
            .filter(|o| o.effective_price == 101)
            .map(|o| o.order.slot)
            .collect();
        assert_eq!(tied, vec![3, 5]);
    }

    #[test]
    fn test_resting_passivity_vs_oracle() {
        let data = oracle(100 * PRICE_PRECISION);
        let user = Pubkey::new_unique();
        let mut book = MarketBook::new(MarketId::perp(0), 100, Some(data));

        // Bid above oracle: in the book but not resting (would cross)
        let aggressive = limit_order(Direction::Long, 101 * PRICE_PRECISION, 10, 1);
        // Bid below oracle: resting maker
        let passive = limit_order(Direction::Long, 99 * PRICE_PRECISION, 10, 2);

        book.insert(classify_order(user, &aggressive, Some(&data), 100, 0).unwrap());
        book.insert(classify_order(user, &passive, Some(&data), 100, 0).unwrap());
        book.seal();

        assert_eq!(book.bids().count(), 2);
        let resting: Vec<u32> = book.resting_limit_bids().map(|o| o.order.order_id).collect();
        assert_eq!(resting, vec![2]);
    }

    #[test]
    fn test_in_auction_not_resting() {
        let mut order = limit_order(Direction::Long, 99 * PRICE_PRECISION, 1000, 1);
        order.auction_start_price = 98 * PRICE_PRECISION as i64;
        order.auction_end_price = 99 * PRICE_PRECISION as i64;
        order.auction_duration = 10;

        let data = oracle(100 * PRICE_PRECISION);
        let entry = classify_order(Pubkey::new_unique(), &order, Some(&data), 1005, 0).unwrap();
        assert!(!entry.is_resting_limit);

        let entry = classify_order(Pubkey::new_unique(), &order, Some(&data), 1011, 0).unwrap();
        assert!(entry.is_resting_limit);
    }
}
