//! User and user-stats account types
//!
//! A user account is identified by its account pubkey and owned by exactly
//! one authority; one authority may own many user accounts. The order array
//! is fixed-size — unused slots carry `OrderStatus::Init`.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::order::Order;

/// Number of order slots embedded in every user account.
pub const MAX_ORDERS: usize = 32;

/// A decoded on-chain user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Signing authority for this account.
    pub authority: Pubkey,
    /// Sub-account discriminator under the authority.
    pub sub_account_id: u16,
    /// Fixed-size order array; `Init` entries are empty slots.
    pub orders: Vec<Order>,
    /// Count of orders with `Open` status, maintained by the program.
    pub open_orders: u8,
    /// Whether any open order is an auction or trigger order.
    pub has_open_auction: bool,
    /// Last slot the program touched this account.
    pub last_active_slot: u64,
}

impl UserAccount {
    pub fn new(authority: Pubkey, sub_account_id: u16) -> Self {
        Self {
            authority,
            sub_account_id,
            orders: vec![Order::default(); MAX_ORDERS],
            open_orders: 0,
            has_open_auction: false,
            last_active_slot: 0,
        }
    }

    /// Live (non-`Init`) orders.
    pub fn set_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.is_set())
    }

    /// Orders currently open on the book.
    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.is_open())
    }

    pub fn has_open_orders(&self) -> bool {
        self.open_orders > 0
    }
}

/// Aggregated per-authority stats account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsAccount {
    pub authority: Pubkey,
    pub number_of_sub_accounts: u16,
    /// 30-day maker volume, QUOTE_PRECISION.
    pub maker_volume_30d: u64,
    /// 30-day taker volume, QUOTE_PRECISION.
    pub taker_volume_30d: u64,
}

impl UserStatsAccount {
    pub fn new(authority: Pubkey) -> Self {
        Self {
            authority,
            number_of_sub_accounts: 0,
            maker_volume_30d: 0,
            taker_volume_30d: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;

    #[test]
    fn test_new_account_all_init() {
        let account = UserAccount::new(Pubkey::new_unique(), 0);
        assert_eq!(account.orders.len(), MAX_ORDERS);
        assert_eq!(account.set_orders().count(), 0);
        assert!(!account.has_open_orders());
    }

    #[test]
    fn test_set_orders_skips_init_slots() {
        let mut account = UserAccount::new(Pubkey::new_unique(), 0);
        account.orders[3].status = OrderStatus::Open;
        account.orders[3].order_id = 7;
        account.orders[9].status = OrderStatus::Canceled;
        account.open_orders = 1;

        assert_eq!(account.set_orders().count(), 2);
        assert_eq!(account.active_orders().count(), 1);
        assert_eq!(account.active_orders().next().unwrap().order_id, 7);
    }
}
