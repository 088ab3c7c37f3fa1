//! External venue subscribers and the L2 generator seam
//!
//! Spot markets can advertise external CLOB venues (phoenix, serum). Each
//! subscriber maintains a local mirror of one venue market and exposes it
//! through [`L2Generator`] — the capability the aggregator consumes for
//! every synthetic liquidity source, vAMM included. Subscribers attach at
//! startup and stay attached for the process lifetime; a venue that fails
//! to subscribe simply contributes nothing (its market's L2 is downgraded),
//! and never fails a tick.
//!
//! Venue account layouts belong to the venues' own SDKs; the subscriber
//! takes the decode step as a function so the production binding stays
//! outside the mirror logic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{info, warn};
use types::market::MarketId;
use types::Pubkey;

use crate::engine::book::BookSide;
use crate::rpc::RpcClient;

/// One synthetic `(price, size)` level, chain precisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: u64,
    pub size: u64,
}

/// A source of synthetic depth levels for one market.
///
/// Implementations return best-first sequences: descending prices for bids,
/// ascending for asks.
pub trait L2Generator: Send + Sync {
    /// Stable source tag used in per-level `sources` maps.
    fn source(&self) -> &'static str;

    fn levels(&self, side: BookSide) -> Vec<PriceLevel>;
}

/// Decoded venue depth, best-first per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VenueLevels {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Decode step from raw venue account data to depth levels.
pub type VenueDecoder = fn(&[u8]) -> Option<VenueLevels>;

/// Local mirror of one external venue market.
#[derive(Debug, Default)]
pub struct VenueBook {
    levels: RwLock<VenueLevels>,
}

impl VenueBook {
    pub fn apply(&self, levels: VenueLevels) {
        *self.levels.write().expect("venue book lock poisoned") = levels;
    }

    pub fn side(&self, side: BookSide) -> Vec<PriceLevel> {
        let book = self.levels.read().expect("venue book lock poisoned");
        match side {
            BookSide::Bid => book.bids.clone(),
            BookSide::Ask => book.asks.clone(),
        }
    }
}

/// Polling subscriber for one venue market.
pub struct VenueSubscriber {
    venue: &'static str,
    market: MarketId,
    venue_market: Pubkey,
    decoder: VenueDecoder,
    book: VenueBook,
    subscribed: AtomicBool,
}

impl VenueSubscriber {
    pub fn new(
        venue: &'static str,
        market: MarketId,
        venue_market: Pubkey,
        decoder: VenueDecoder,
    ) -> Self {
        Self {
            venue,
            market,
            venue_market,
            decoder,
            book: VenueBook::default(),
            subscribed: AtomicBool::new(false),
        }
    }

    pub fn venue(&self) -> &'static str {
        self.venue
    }

    pub fn market(&self) -> MarketId {
        self.market
    }

    /// Whether the initial subscribe succeeded; unsubscribed venues are
    /// omitted from aggregation.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Relaxed)
    }

    /// Fetch and apply the current venue state once.
    async fn refresh(&self, rpc: &RpcClient) -> anyhow::Result<()> {
        let data = rpc
            .get_account_data(&self.venue_market)
            .await?
            .ok_or_else(|| anyhow::anyhow!("venue account missing"))?;
        let levels = (self.decoder)(&data)
            .ok_or_else(|| anyhow::anyhow!("venue account failed to decode"))?;
        self.book.apply(levels);
        Ok(())
    }

    /// Subscribe and keep the mirror fresh for the process lifetime.
    ///
    /// The initial fetch decides subscription state; refresh failures after
    /// that are transient and logged.
    pub async fn run(self: Arc<Self>, rpc: Arc<RpcClient>, interval: Duration) {
        match self.refresh(&rpc).await {
            Ok(()) => {
                self.subscribed.store(true, Ordering::Relaxed);
                info!(venue = self.venue, market = %self.market, "venue subscribed");
            }
            Err(error) => {
                warn!(
                    venue = self.venue,
                    market = %self.market,
                    %error,
                    "venue subscribe failed, fallback disabled for this market"
                );
                return;
            }
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(error) = self.refresh(&rpc).await {
                warn!(venue = self.venue, market = %self.market, %error, "venue refresh failed");
            }
        }
    }

    /// Test/offline hook: mark subscribed and seed the mirror directly.
    pub fn seed(&self, levels: VenueLevels) {
        self.subscribed.store(true, Ordering::Relaxed);
        self.book.apply(levels);
    }
}

impl L2Generator for VenueSubscriber {
    fn source(&self) -> &'static str {
        self.venue
    }

    fn levels(&self, side: BookSide) -> Vec<PriceLevel> {
        if !self.is_subscribed() {
            return Vec::new();
        }
        self.book.side(side)
    }
}

/// All venue subscribers for the process, looked up per market at query time.
#[derive(Default)]
pub struct VenueRegistry {
    subscribers: Vec<Arc<VenueSubscriber>>,
}

impl VenueRegistry {
    pub fn new(subscribers: Vec<Arc<VenueSubscriber>>) -> Self {
        Self { subscribers }
    }

    pub fn get(&self, market: MarketId, venue: &str) -> Option<Arc<VenueSubscriber>> {
        self.subscribers
            .iter()
            .find(|s| s.market() == market && s.venue() == venue)
            .cloned()
    }

    pub fn all(&self) -> &[Arc<VenueSubscriber>] {
        &self.subscribers
    }
}

/// Compact ladder decode: `[bid_count u64][ask_count u64]` then little-endian
/// `(price u64, size u64)` pairs, bids first. The production phoenix/serum
/// bindings replace this with their SDK slab decoders.
pub fn decode_compact_ladder(data: &[u8]) -> Option<VenueLevels> {
    fn read_u64(data: &mut &[u8]) -> Option<u64> {
        let (head, rest) = data.split_first_chunk::<8>()?;
        *data = rest;
        Some(u64::from_le_bytes(*head))
    }

    let mut rest = data;
    let bid_count = read_u64(&mut rest)? as usize;
    let ask_count = read_u64(&mut rest)? as usize;
    let mut read_side = |count: usize| -> Option<Vec<PriceLevel>> {
        let mut side = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let price = read_u64(&mut rest)?;
            let size = read_u64(&mut rest)?;
            side.push(PriceLevel { price, size });
        }
        Some(side)
    };
    let bids = read_side(bid_count)?;
    let asks = read_side(ask_count)?;
    Some(VenueLevels { bids, asks })
}
