//! L2 / L3 aggregation over a sealed market book
//!
//! L2 merges three kinds of depth: resting and in-auction orders from the
//! book itself (source `dlob`), synthetic vAMM levels (perp only), and
//! fallback venue levels (spot only). Every output level carries a
//! per-source size breakdown; same-price levels coalesce across sources.
//! Grouping buckets prices into fixed-width intervals — bids round down,
//! asks round up — and the depth cut is applied after grouping, with the
//! book drawn unlimited through the `-1` sentinel.
//!
//! All amounts serialize as decimal strings.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use types::market::MarketId;
use types::numeric::{standardize_price_down, standardize_price_up};
use types::oracle::OraclePriceData;
use types::Pubkey;

use crate::engine::book::{BookSide, MarketBook};
use crate::user_stats::UserStatsIndex;
use crate::venues::L2Generator;

/// Source tag for orders drawn from the book itself.
pub const DLOB_SOURCE: &str = "dlob";

/// Sentinel: draw the side without a depth cut.
pub const DEPTH_UNLIMITED: i64 = -1;

/// One aggregated price level with its per-source contributions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Level {
    pub price: u64,
    pub size: u64,
    /// `source tag -> contributed size`.
    pub sources: BTreeMap<&'static str, u64>,
}

impl Serialize for L2Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("price", &self.price.to_string())?;
        map.serialize_entry("size", &self.size.to_string())?;
        let sources: BTreeMap<&str, String> = self
            .sources
            .iter()
            .map(|(name, size)| (*name, size.to_string()))
            .collect();
        map.serialize_entry("sources", &sources)?;
        map.end()
    }
}

/// Aggregated depth for one market at one slot.
#[derive(Debug, Clone, Serialize)]
pub struct L2Snapshot {
    pub bids: Vec<L2Level>,
    pub asks: Vec<L2Level>,
    pub slot: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OraclePriceData>,
    #[serde(skip)]
    pub market: MarketId,
}

/// Depth request against one book.
pub struct L2Request<'a> {
    /// Levels per side; [`DEPTH_UNLIMITED`] for no cut.
    pub depth: i64,
    /// Bucket width; `None` leaves exact prices.
    pub grouping: Option<u64>,
    /// Synthetic generators to merge in (vAMM, venue fallbacks).
    pub generators: Vec<&'a dyn L2Generator>,
    pub include_oracle: bool,
}

/// Build the aggregated L2 view of `book`.
pub fn get_l2(book: &MarketBook, request: &L2Request<'_>) -> L2Snapshot {
    // Grouping needs the whole side before bucketing.
    let book_depth = if request.grouping.is_some() {
        DEPTH_UNLIMITED
    } else {
        request.depth
    };

    let bids = build_side(book, BookSide::Bid, book_depth, request);
    let asks = build_side(book, BookSide::Ask, book_depth, request);

    L2Snapshot {
        bids,
        asks,
        slot: book.slot,
        oracle: request.include_oracle.then_some(book.oracle).flatten(),
        market: book.market,
    }
}

fn build_side(
    book: &MarketBook,
    side: BookSide,
    book_depth: i64,
    request: &L2Request<'_>,
) -> Vec<L2Level> {
    // price -> per-source sizes; BTreeMap keeps the merge ordered.
    let mut merged: BTreeMap<u64, BTreeMap<&'static str, u64>> = BTreeMap::new();
    let mut deposit = |price: u64, size: u64, source: &'static str| {
        if size == 0 {
            return;
        }
        let entry = merged.entry(price).or_default();
        *entry.entry(source).or_insert(0) += size;
    };

    // Depth limits distinct price levels, not orders: every order at a
    // surviving price contributes its size. The side is sorted, so we can
    // break as soon as a new price would exceed the budget.
    let mut levels_drawn = 0usize;
    let mut last_price: Option<u64> = None;
    for order in book.side(side) {
        if last_price != Some(order.effective_price) {
            levels_drawn += 1;
            if book_depth >= 0 && levels_drawn > book_depth as usize {
                break;
            }
            last_price = Some(order.effective_price);
        }
        deposit(order.effective_price, order.size(), DLOB_SOURCE);
    }

    for generator in &request.generators {
        for level in generator.levels(side) {
            deposit(level.price, level.size, generator.source());
        }
    }

    let mut levels: Vec<L2Level> = merged
        .into_iter()
        .map(|(price, sources)| L2Level {
            price,
            size: sources.values().sum(),
            sources,
        })
        .collect();
    if side == BookSide::Bid {
        levels.reverse(); // best-first
    }

    if let Some(grouping) = request.grouping.filter(|g| *g > 0) {
        levels = group_levels(levels, side, grouping);
    }

    if request.depth >= 0 {
        levels.truncate(request.depth as usize);
    }
    levels
}

/// Bucket levels into `grouping`-wide intervals, summing sizes and
/// per-source contributions. Bids round down, asks round up.
fn group_levels(levels: Vec<L2Level>, side: BookSide, grouping: u64) -> Vec<L2Level> {
    let mut buckets: BTreeMap<u64, L2Level> = BTreeMap::new();
    for level in levels {
        let bucket_price = match side {
            BookSide::Bid => standardize_price_down(level.price, grouping),
            BookSide::Ask => standardize_price_up(level.price, grouping),
        };
        let bucket = buckets.entry(bucket_price).or_insert_with(|| L2Level {
            price: bucket_price,
            size: 0,
            sources: BTreeMap::new(),
        });
        bucket.size += level.size;
        for (source, size) in level.sources {
            *bucket.sources.entry(source).or_insert(0) += size;
        }
    }

    let grouped: Vec<L2Level> = buckets.into_values().collect();
    match side {
        BookSide::Bid => grouped.into_iter().rev().collect(),
        BookSide::Ask => grouped,
    }
}

/// One resting order in an L3 view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Level {
    pub price: String,
    pub size: String,
    /// Owning user account.
    pub maker: String,
    pub order_id: u32,
}

/// Per-order book view: every resting order individually, no synthetic
/// liquidity, no bucketing.
#[derive(Debug, Clone, Serialize)]
pub struct L3Snapshot {
    pub bids: Vec<L3Level>,
    pub asks: Vec<L3Level>,
    pub slot: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OraclePriceData>,
}

pub fn get_l3(book: &MarketBook, include_oracle: bool) -> L3Snapshot {
    let to_level = |order: &crate::engine::book::BookOrder| L3Level {
        price: order.effective_price.to_string(),
        size: order.size().to_string(),
        maker: order.user.to_string(),
        order_id: order.order.order_id,
    };
    L3Snapshot {
        bids: book.resting_limit_bids().map(to_level).collect(),
        asks: book.resting_limit_asks().map(to_level).collect(),
        slot: book.slot,
        oracle: include_oracle.then_some(book.oracle).flatten(),
    }
}

/// A top maker entry: the account pubkey, optionally paired with its
/// authority's stats-account pubkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopMaker {
    Account(Pubkey),
    WithStats { account: Pubkey, user_stats: Pubkey },
}

impl Serialize for TopMaker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TopMaker::Account(account) => serializer.serialize_str(&account.to_string()),
            TopMaker::WithStats {
                account,
                user_stats,
            } => vec![account.to_string(), user_stats.to_string()].serialize(serializer),
        }
    }
}

/// Walk the resting side best-first and emit up to `limit` distinct maker
/// accounts. Stats pubkeys are resolved lazily per authority.
pub fn top_makers(
    book: &MarketBook,
    side: BookSide,
    limit: Option<usize>,
    user_stats: Option<&UserStatsIndex>,
    authority_of: impl Fn(&Pubkey) -> Option<Pubkey>,
) -> Vec<TopMaker> {
    let mut seen: Vec<Pubkey> = Vec::new();
    let mut out = Vec::new();
    for order in book.resting_side(side) {
        if seen.contains(&order.user) {
            continue;
        }
        seen.push(order.user);
        let entry = match user_stats {
            Some(index) => {
                let authority = authority_of(&order.user).unwrap_or(order.user);
                let (stats_pubkey, _) = index.must_get(&authority);
                TopMaker::WithStats {
                    account: order.user,
                    user_stats: stats_pubkey,
                }
            }
            None => TopMaker::Account(order.user),
        };
        out.push(entry);
        if limit.is_some_and(|cap| out.len() >= cap) {
            break;
        }
    }
    out
}
