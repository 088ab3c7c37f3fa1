//! DLOB account providers
//!
//! The engine does not care where user accounts come from; it reads the
//! shared [`OrderIndex`]. A [`DlobProvider`] owns keeping that index fresh.
//! Two implementations exist, selected by `USE_ORDER_SUBSCRIBER`:
//!
//! - [`UserMapProvider`] mirrors every user account of the program.
//! - [`OrderSubscriberProvider`] mirrors only accounts with open orders —
//!   a much smaller working set on busy deployments.
//!
//! Both support polling (`getProgramAccounts` sweeps) and push
//! (`programSubscribe`) transports; a sweep is a full resync, so accounts
//! that vanished from the result set are deleted from the index.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use types::account::UserAccount;
use types::Pubkey;

use crate::codec;
use crate::metrics::ServiceMetrics;
use crate::order_index::OrderIndex;
use crate::rpc::{KeyedAccount, RpcClient};
use crate::slot::SlotSource;

/// On-chain program whose user accounts form the book.
pub const PROGRAM_ID: &str = "dRiftyHA7874qzKXmF2YLyfMBPdAoHdQPH2cGd5R2s9";

/// Capacity of the push-mode update channel.
const UPDATE_CHANNEL_CAPACITY: usize = 4096;

/// Supplier of user-account state to the DLOB.
#[async_trait]
pub trait DlobProvider: Send + Sync {
    /// Perform the initial sync and start the background feed. Returns once
    /// the index holds a complete first pass; the handle owns the feed task
    /// so the supervisor can tear it down on restart.
    async fn subscribe(self: Arc<Self>) -> anyhow::Result<tokio::task::JoinHandle<()>>;

    /// Whether the initial sync completed.
    fn is_subscribed(&self) -> bool;

    fn size(&self) -> usize;

    fn get_user_account(&self, pubkey: &Pubkey) -> Option<UserAccount>;

    /// Visit every tracked `(pubkey, account)` pair.
    fn for_each_account(&self, f: &mut dyn FnMut(&Pubkey, &UserAccount));

    fn unique_authorities(&self) -> HashSet<Pubkey>;
}

/// Which accounts a provider keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retention {
    /// Every user account.
    All,
    /// Only accounts with open orders.
    OpenOrdersOnly,
}

impl Retention {
    fn keeps(&self, account: &UserAccount) -> bool {
        match self {
            Retention::All => true,
            Retention::OpenOrdersOnly => account.has_open_orders(),
        }
    }
}

/// Shared sync machinery behind both provider flavors.
struct ProviderCore {
    index: Arc<OrderIndex>,
    rpc: Arc<RpcClient>,
    slot_source: Arc<SlotSource>,
    metrics: Arc<ServiceMetrics>,
    program: Pubkey,
    retention: Retention,
    use_websocket: bool,
    polling_interval: Duration,
    subscribed: AtomicBool,
    label: &'static str,
}

impl ProviderCore {
    /// Apply one observed account to the index.
    fn apply(&self, observed: &KeyedAccount) {
        match codec::decode_user_account(&observed.data) {
            Ok(account) if self.retention.keeps(&account) => {
                self.index.upsert(observed.pubkey, account);
                self.metrics.record_account_update();
            }
            Ok(_) => {
                // Fell out of retention (e.g. last order filled).
                self.index.delete(&observed.pubkey);
            }
            Err(error) => {
                debug!(pubkey = %observed.pubkey, %error, "skipping undecodable user account");
            }
        }
        if observed.slot > 0 {
            self.slot_source.update(observed.slot);
        }
    }

    /// Full sweep: upsert everything fetched, delete everything that
    /// disappeared since the previous sweep.
    async fn resync(&self) -> anyhow::Result<()> {
        let fetched = self.rpc.get_program_accounts(&self.program).await?;
        let mut seen: HashSet<Pubkey> = HashSet::with_capacity(fetched.len());
        for observed in &fetched {
            self.apply(observed);
            seen.insert(observed.pubkey);
        }
        for stale in self
            .index
            .pubkeys()
            .into_iter()
            .filter(|pubkey| !seen.contains(pubkey))
        {
            self.index.delete(&stale);
        }
        debug!(
            provider = self.label,
            accounts = self.index.size(),
            "account resync complete"
        );
        Ok(())
    }

    async fn run_polling(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.polling_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(error) = self.resync().await {
                warn!(provider = self.label, %error, "account poll failed");
            }
            if let Ok(slot) = self.rpc.get_slot().await {
                self.slot_source.update(slot);
            }
        }
    }

    async fn run_websocket(self: Arc<Self>) {
        loop {
            let (tx, mut rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
            let socket = {
                let core = self.clone();
                let program = core.program;
                tokio::spawn(async move { core.rpc.subscribe_program(&program, tx).await })
            };
            while let Some(observed) = rx.recv().await {
                self.apply(&observed);
            }
            if let Ok(Err(error)) = socket.await {
                warn!(provider = self.label, %error, "program subscription dropped");
            }
            // Resubscribe after a short pause; a sweep repairs anything
            // missed while disconnected.
            tokio::time::sleep(Duration::from_secs(1)).await;
            if let Err(error) = self.resync().await {
                warn!(provider = self.label, %error, "post-reconnect resync failed");
            }
        }
    }

    async fn subscribe(self: &Arc<Self>) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        self.resync().await?;
        let slot = self.rpc.get_slot().await?;
        self.slot_source.update(slot);
        self.subscribed.store(true, Ordering::Relaxed);
        info!(
            provider = self.label,
            accounts = self.index.size(),
            slot,
            websocket = self.use_websocket,
            "provider subscribed"
        );

        let core = self.clone();
        let handle = if self.use_websocket {
            tokio::spawn(core.run_websocket())
        } else {
            tokio::spawn(core.run_polling())
        };
        Ok(handle)
    }
}

macro_rules! delegate_provider {
    ($name:ident) => {
        #[async_trait]
        impl DlobProvider for $name {
            async fn subscribe(self: Arc<Self>) -> anyhow::Result<tokio::task::JoinHandle<()>> {
                self.core.subscribe().await
            }

            fn is_subscribed(&self) -> bool {
                self.core.subscribed.load(Ordering::Relaxed)
            }

            fn size(&self) -> usize {
                self.core.index.size()
            }

            fn get_user_account(&self, pubkey: &Pubkey) -> Option<UserAccount> {
                self.core.index.get(pubkey)
            }

            fn for_each_account(&self, f: &mut dyn FnMut(&Pubkey, &UserAccount)) {
                self.core.index.for_each(|pubkey, account| f(pubkey, account));
            }

            fn unique_authorities(&self) -> HashSet<Pubkey> {
                self.core.index.unique_authorities()
            }
        }
    };
}

/// Full mirror of every user account.
pub struct UserMapProvider {
    core: Arc<ProviderCore>,
}

impl UserMapProvider {
    pub fn new(
        index: Arc<OrderIndex>,
        rpc: Arc<RpcClient>,
        slot_source: Arc<SlotSource>,
        metrics: Arc<ServiceMetrics>,
        program: Pubkey,
        use_websocket: bool,
        polling_interval: Duration,
    ) -> Self {
        Self {
            core: Arc::new(ProviderCore {
                index,
                rpc,
                slot_source,
                metrics,
                program,
                retention: Retention::All,
                use_websocket,
                polling_interval,
                subscribed: AtomicBool::new(false),
                label: "user_map",
            }),
        }
    }
}

delegate_provider!(UserMapProvider);

/// Compact mirror: only accounts currently carrying open orders.
pub struct OrderSubscriberProvider {
    core: Arc<ProviderCore>,
}

impl OrderSubscriberProvider {
    pub fn new(
        index: Arc<OrderIndex>,
        rpc: Arc<RpcClient>,
        slot_source: Arc<SlotSource>,
        metrics: Arc<ServiceMetrics>,
        program: Pubkey,
        use_websocket: bool,
        polling_interval: Duration,
    ) -> Self {
        Self {
            core: Arc::new(ProviderCore {
                index,
                rpc,
                slot_source,
                metrics,
                program,
                retention: Retention::OpenOrdersOnly,
                use_websocket,
                polling_interval,
                subscribed: AtomicBool::new(false),
                label: "order_subscriber",
            }),
        }
    }
}

delegate_provider!(OrderSubscriberProvider);

#[cfg(test)]
mod tests {
    use super::*;
    use types::order::{Order, OrderStatus};

    fn account(open_orders: u8) -> UserAccount {
        let mut account = UserAccount::new(Pubkey::new_unique(), 0);
        if open_orders > 0 {
            account.orders[0] = Order {
                status: OrderStatus::Open,
                order_id: 1,
                price: 1,
                base_asset_amount: 1,
                ..Order::default()
            };
        }
        account.open_orders = open_orders;
        account
    }

    #[test]
    fn test_retention_policies() {
        assert!(Retention::All.keeps(&account(0)));
        assert!(Retention::All.keeps(&account(1)));
        assert!(!Retention::OpenOrdersOnly.keeps(&account(0)));
        assert!(Retention::OpenOrdersOnly.keeps(&account(1)));
    }
}
