//! DLOB engine: periodic book rebuild and snapshot publication
//!
//! One logical task owns the rebuild; HTTP handlers are readers. A rebuild
//! walks every user account in the index exactly once, deposits each open
//! order into its market's book at the effective price for the tick slot,
//! seals the sides, and swaps the finished snapshot in behind an `RwLock`
//! holding an `Arc`. Readers clone the `Arc` and can never observe a
//! half-built book. A failed rebuild leaves the previous snapshot
//! authoritative; a single malformed order is logged and skipped.

pub mod book;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};
use types::market::{MarketId, MarketRegistry};

use crate::metrics::ServiceMetrics;
use crate::oracle_map::OracleMap;
use crate::order_index::OrderIndex;
use crate::slot::SlotSource;
use book::{classify_order, Exclusion, MarketBook};

/// All market books for one tick.
#[derive(Debug, Clone)]
pub struct DlobSnapshot {
    /// Slot every book in this snapshot was built against.
    pub slot: u64,
    books: HashMap<MarketId, MarketBook>,
}

impl DlobSnapshot {
    fn empty() -> Self {
        Self {
            slot: 0,
            books: HashMap::new(),
        }
    }

    pub fn book(&self, market: MarketId) -> Option<&MarketBook> {
        self.books.get(&market)
    }

    pub fn books(&self) -> impl Iterator<Item = &MarketBook> {
        self.books.values()
    }

    /// Total orders across all books.
    pub fn order_count(&self) -> usize {
        self.books.values().map(|b| b.len()).sum()
    }
}

/// Builds and publishes DLOB snapshots on a fixed tick.
pub struct DlobEngine {
    order_index: Arc<OrderIndex>,
    oracle_map: Arc<OracleMap>,
    slot_source: Arc<SlotSource>,
    registry: Arc<MarketRegistry>,
    metrics: Arc<ServiceMetrics>,
    snapshot: RwLock<Arc<DlobSnapshot>>,
    /// Serializes rebuilds: a tick that fires while the previous rebuild is
    /// still running is dropped rather than queued.
    rebuild_guard: Mutex<()>,
    published_nonempty: AtomicBool,
}

impl DlobEngine {
    pub fn new(
        order_index: Arc<OrderIndex>,
        oracle_map: Arc<OracleMap>,
        slot_source: Arc<SlotSource>,
        registry: Arc<MarketRegistry>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            order_index,
            oracle_map,
            slot_source,
            registry,
            metrics,
            snapshot: RwLock::new(Arc::new(DlobSnapshot::empty())),
            rebuild_guard: Mutex::new(()),
            published_nonempty: AtomicBool::new(false),
        }
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<DlobSnapshot> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    /// Whether any tick has published a non-empty snapshot.
    pub fn has_published_nonempty(&self) -> bool {
        self.published_nonempty.load(Ordering::Relaxed)
    }

    pub fn order_index(&self) -> &Arc<OrderIndex> {
        &self.order_index
    }

    pub fn oracle_map(&self) -> &Arc<OracleMap> {
        &self.oracle_map
    }

    pub fn slot_source(&self) -> &Arc<SlotSource> {
        &self.slot_source
    }

    pub fn registry(&self) -> &Arc<MarketRegistry> {
        &self.registry
    }

    /// Rebuild every market book and publish the result.
    ///
    /// Returns `false` when another rebuild was already in flight and this
    /// tick was skipped.
    pub fn rebuild(&self) -> bool {
        let Ok(_guard) = self.rebuild_guard.try_lock() else {
            debug!("rebuild already in flight, skipping tick");
            return false;
        };

        let slot = self.slot_source.current_slot();
        let now = unix_now();
        let mut books: HashMap<MarketId, MarketBook> = self
            .registry
            .market_ids()
            .map(|id| (id, MarketBook::new(id, slot, self.oracle_map.get(id))))
            .collect();

        let mut skipped: u64 = 0;
        self.order_index.for_each(|pubkey, account| {
            for order in account.active_orders() {
                let market = MarketId {
                    market_type: order.market_type,
                    market_index: order.market_index,
                };
                let Some(market_book) = books.get_mut(&market) else {
                    // Order for a market this process does not serve.
                    continue;
                };
                match classify_order(*pubkey, order, market_book.oracle.as_ref(), slot, now) {
                    Ok(entry) => market_book.insert(entry),
                    Err(
                        Exclusion::Untriggered | Exclusion::NotOpen | Exclusion::NoSize,
                    ) => {}
                    Err(Exclusion::Expired) => {}
                    Err(Exclusion::Unpriced) => {
                        skipped += 1;
                        self.metrics.record_order_skipped();
                        debug!(
                            user = %pubkey,
                            order_id = order.order_id,
                            market = %market,
                            "skipping unpriceable order"
                        );
                    }
                }
            }
        });

        for market_book in books.values_mut() {
            market_book.seal();
        }

        self.publish(slot, books);
        self.metrics.record_tick();
        if skipped > 0 {
            debug!(skipped, slot, "tick completed with skipped orders");
        }
        true
    }

    /// Swap the finished snapshot in. The snapshot slot never goes
    /// backwards, even if the slot source produced a stale reading between
    /// ticks.
    fn publish(&self, slot: u64, books: HashMap<MarketId, MarketBook>) {
        let mut current = self.snapshot.write().expect("snapshot lock poisoned");
        let slot = slot.max(current.slot);
        let next = DlobSnapshot { slot, books };
        if next.order_count() > 0 {
            self.published_nonempty.store(true, Ordering::Relaxed);
        }
        *current = Arc::new(next);
    }

    /// Drive the rebuild on a fixed interval until the task is aborted.
    pub async fn run(self: Arc<Self>, tick: Duration) {
        info!(interval_ms = tick.as_millis() as u64, "book builder started");
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let engine = self.clone();
            // The rebuild is synchronous; run it off the async worker so a
            // large book cannot stall the reactor.
            let result = tokio::task::spawn_blocking(move || engine.rebuild()).await;
            if let Err(join_err) = result {
                self.metrics.record_tick_failure();
                error!(error = %join_err, "tick rebuild panicked, keeping previous snapshot");
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
