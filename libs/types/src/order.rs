//! The on-chain order model
//!
//! Field layout mirrors the program's account encoding exactly (borsh, fixed
//! order) — the wire codec depends on it being bit-identical. `Init` marks an
//! empty slot in a user account's order array and must never surface in any
//! query output.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::market::MarketType;

/// Order lifecycle status.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// Empty order slot; excluded from all outputs.
    Init,
    Open,
    Canceled,
    Filled,
}

/// Order execution semantics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OrderType {
    Limit,
    Market,
    TriggerLimit,
    TriggerMarket,
    /// Limit order priced as an offset from the oracle.
    Oracle,
}

/// Bid/ask side, expressed as position direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Bid.
    Long,
    /// Ask.
    Short,
}

impl Direction {
    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Activation condition for trigger orders.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum OrderTriggerCondition {
    Above,
    Below,
    TriggeredAbove,
    TriggeredBelow,
}

impl OrderTriggerCondition {
    /// Whether the condition holds against the given oracle price.
    pub fn is_satisfied(&self, trigger_price: u64, oracle_price: i64) -> bool {
        match self {
            OrderTriggerCondition::Above => oracle_price > trigger_price as i64,
            OrderTriggerCondition::Below => oracle_price < trigger_price as i64,
            OrderTriggerCondition::TriggeredAbove | OrderTriggerCondition::TriggeredBelow => true,
        }
    }
}

/// A single order embedded in a user account's order array.
///
/// Field order is the program's account layout; do not reorder.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Slot the order was posted in.
    pub slot: u64,
    /// Limit price, PRICE_PRECISION. Zero for pure market orders.
    pub price: u64,
    /// Order size, BASE_PRECISION.
    pub base_asset_amount: u64,
    /// Filled so far, BASE_PRECISION.
    pub base_asset_amount_filled: u64,
    /// Quote-denominated size, QUOTE_PRECISION.
    pub quote_asset_amount: u64,
    /// Quote filled so far, QUOTE_PRECISION.
    pub quote_asset_amount_filled: u64,
    /// Activation price for trigger orders, PRICE_PRECISION.
    pub trigger_price: u64,
    /// Auction start price, PRICE_PRECISION (signed: oracle-relative for
    /// oracle orders).
    pub auction_start_price: i64,
    /// Auction end price, PRICE_PRECISION.
    pub auction_end_price: i64,
    /// Unix expiry, seconds. Zero means no expiry.
    pub max_ts: i64,
    /// Price offset from oracle for oracle orders, PRICE_PRECISION.
    pub oracle_price_offset: i32,
    /// Unique within the owning user account.
    pub order_id: u32,
    pub market_index: u16,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub market_type: MarketType,
    /// Client-assigned id.
    pub user_order_id: u8,
    pub existing_position_direction: Direction,
    pub direction: Direction,
    pub reduce_only: bool,
    pub post_only: bool,
    pub immediate_or_cancel: bool,
    pub trigger_condition: OrderTriggerCondition,
    /// Auction length in slots. Zero means no auction phase.
    pub auction_duration: u8,
}

impl Order {
    /// Whether this slot holds a live order (anything but `Init`).
    pub fn is_set(&self) -> bool {
        self.status != OrderStatus::Init
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Unfilled base size.
    pub fn base_asset_amount_unfilled(&self) -> u64 {
        self.base_asset_amount
            .saturating_sub(self.base_asset_amount_filled)
    }

    /// Whether the posting auction has fully elapsed at `slot`.
    pub fn is_auction_complete(&self, slot: u64) -> bool {
        if self.auction_duration == 0 {
            return true;
        }
        slot.saturating_sub(self.slot) >= self.auction_duration as u64
    }

    /// Whether the order must be triggered before it can rest.
    pub fn must_be_triggered(&self) -> bool {
        matches!(
            self.order_type,
            OrderType::TriggerLimit | OrderType::TriggerMarket
        )
    }

    /// Whether a trigger order has already fired on chain.
    pub fn is_triggered(&self) -> bool {
        matches!(
            self.trigger_condition,
            OrderTriggerCondition::TriggeredAbove | OrderTriggerCondition::TriggeredBelow
        )
    }

    /// Whether the order has a fixed limit price once resting.
    pub fn has_limit_price(&self) -> bool {
        self.price > 0 || self.oracle_price_offset != 0
    }

    /// Whether `max_ts` has passed at `now` (Unix seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        self.max_ts != 0 && self.max_ts < now
    }
}

impl Default for Order {
    fn default() -> Self {
        Self {
            slot: 0,
            price: 0,
            base_asset_amount: 0,
            base_asset_amount_filled: 0,
            quote_asset_amount: 0,
            quote_asset_amount_filled: 0,
            trigger_price: 0,
            auction_start_price: 0,
            auction_end_price: 0,
            max_ts: 0,
            oracle_price_offset: 0,
            order_id: 0,
            market_index: 0,
            status: OrderStatus::Init,
            order_type: OrderType::Limit,
            market_type: MarketType::Perp,
            user_order_id: 0,
            existing_position_direction: Direction::Long,
            direction: Direction::Long,
            reduce_only: false,
            post_only: false,
            immediate_or_cancel: false,
            trigger_condition: OrderTriggerCondition::Above,
            auction_duration: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_order() -> Order {
        Order {
            status: OrderStatus::Open,
            order_id: 1,
            price: 100_000_000,
            base_asset_amount: 5_000_000_000,
            slot: 1000,
            ..Order::default()
        }
    }

    #[test]
    fn test_default_is_init() {
        let order = Order::default();
        assert!(!order.is_set());
        assert!(!order.is_open());
    }

    #[test]
    fn test_unfilled() {
        let mut order = open_order();
        order.base_asset_amount_filled = 2_000_000_000;
        assert_eq!(order.base_asset_amount_unfilled(), 3_000_000_000);

        // Overfill clamps to zero rather than wrapping
        order.base_asset_amount_filled = order.base_asset_amount + 1;
        assert_eq!(order.base_asset_amount_unfilled(), 0);
    }

    #[test]
    fn test_auction_completion() {
        let mut order = open_order();
        order.auction_duration = 10;
        assert!(!order.is_auction_complete(1005));
        assert!(order.is_auction_complete(1010));
        assert!(order.is_auction_complete(2000));

        order.auction_duration = 0;
        assert!(order.is_auction_complete(1000));
    }

    #[test]
    fn test_trigger_condition() {
        assert!(OrderTriggerCondition::Above.is_satisfied(100, 101));
        assert!(!OrderTriggerCondition::Above.is_satisfied(100, 100));
        assert!(OrderTriggerCondition::Below.is_satisfied(100, 99));
        assert!(OrderTriggerCondition::TriggeredAbove.is_satisfied(100, 0));
    }

    #[test]
    fn test_expiry() {
        let mut order = open_order();
        assert!(!order.is_expired(i64::MAX)); // max_ts == 0 means no expiry
        order.max_ts = 500;
        assert!(order.is_expired(501));
        assert!(!order.is_expired(500));
    }

    #[test]
    fn test_borsh_round_trip() {
        let order = open_order();
        let bytes = borsh::to_vec(&order).unwrap();
        let decoded = Order::try_from_slice(&bytes).unwrap();
        assert_eq!(order, decoded);
    }

    #[test]
    fn test_raw_json_emits_numbers() {
        // The raw view keeps numeric fields as JSON numbers
        let order = open_order();
        let json = serde_json::to_value(order).unwrap();
        assert_eq!(json["price"], serde_json::json!(100_000_000u64));
        assert_eq!(json["status"], serde_json::json!("open"));
    }
}
