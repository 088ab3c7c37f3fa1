//! Process entry point: wiring and supervision
//!
//! Builds the whole pipeline from configuration, then hands it to the
//! supervisor: any failure tears the run down (background tasks included),
//! waits the fixed backoff, and rebuilds everything from scratch. The only
//! path that exits the process is an unusable configuration.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;
use types::Pubkey;

use dlob_server::config::Config;
use dlob_server::engine::DlobEngine;
use dlob_server::http::rate_limit::RateLimiter;
use dlob_server::http::{create_router, AppState};
use dlob_server::markets;
use dlob_server::metrics::ServiceMetrics;
use dlob_server::oracle_map::OracleMap;
use dlob_server::order_index::OrderIndex;
use dlob_server::provider::{
    DlobProvider, OrderSubscriberProvider, UserMapProvider, PROGRAM_ID,
};
use dlob_server::rpc::RpcClient;
use dlob_server::slot::SlotSource;
use dlob_server::supervisor;
use dlob_server::user_stats::UserStatsIndex;
use dlob_server::vamm::VammMap;
use dlob_server::venues::{decode_compact_ladder, VenueRegistry, VenueSubscriber};

/// Background tasks owned by one run; aborted when the run ends so a
/// supervisor restart never leaks stale loops.
struct TaskGroup(Vec<JoinHandle<()>>);

impl TaskGroup {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn push(&mut self, handle: JoinHandle<()>) {
        self.0.push(handle);
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal configuration error: {err}");
            std::process::exit(1);
        }
    };

    info!(
        env = %config.env,
        port = config.port,
        commit = %config.commit,
        order_subscriber = config.use_order_subscriber,
        websocket = config.use_websocket,
        "starting dlob-server"
    );

    supervisor::supervise(|| run(config.clone())).await;
}

/// One full service run: subscribe, build, serve. Never returns while
/// healthy.
async fn run(config: Config) -> anyhow::Result<()> {
    let mut tasks = TaskGroup::new();

    let rpc = Arc::new(RpcClient::new(
        config.endpoint.clone(),
        config.ws_endpoint.clone(),
    ));
    let program = Pubkey::from_str(PROGRAM_ID)?;

    let order_index = Arc::new(OrderIndex::new());
    let oracle_map = Arc::new(OracleMap::new());
    let vamm_map = Arc::new(VammMap::new());
    let slot_source = Arc::new(SlotSource::new());
    let metrics = Arc::new(ServiceMetrics::new());
    let user_stats = Arc::new(UserStatsIndex::new());

    // Markets are static per process: discovered once, refreshed in place.
    let registry = Arc::new(
        markets::load_registry(&rpc, &program, &oracle_map, &vamm_map).await?,
    );
    tasks.push(tokio::spawn(markets::run_poller(
        rpc.clone(),
        registry.clone(),
        oracle_map.clone(),
        vamm_map.clone(),
        slot_source.clone(),
        config.polling_interval,
    )));

    let provider: Arc<dyn DlobProvider> = if config.use_order_subscriber {
        Arc::new(OrderSubscriberProvider::new(
            order_index.clone(),
            rpc.clone(),
            slot_source.clone(),
            metrics.clone(),
            program,
            config.use_websocket,
            config.polling_interval,
        ))
    } else {
        Arc::new(UserMapProvider::new(
            order_index.clone(),
            rpc.clone(),
            slot_source.clone(),
            metrics.clone(),
            program,
            config.use_websocket,
            config.polling_interval,
        ))
    };
    tasks.push(provider.clone().subscribe().await?);

    // Seed the stats index so the startup probe can see it populated.
    for authority in provider.unique_authorities() {
        user_stats.must_get(&authority);
    }

    let engine = Arc::new(DlobEngine::new(
        order_index,
        oracle_map,
        slot_source,
        registry.clone(),
        metrics.clone(),
    ));
    tasks.push(tokio::spawn(engine.clone().run(config.tick_interval)));

    // Venue subscribers attach once per configured spot venue; a failed
    // subscribe just downgrades that market's L2.
    let mut subscribers = Vec::new();
    for market in registry.all() {
        for (venue, address) in [
            ("phoenix", market.phoenix_market),
            ("serum", market.serum_market),
        ] {
            let Some(address) = address else { continue };
            let subscriber = Arc::new(VenueSubscriber::new(
                venue,
                market.market_id,
                address,
                decode_compact_ladder,
            ));
            tasks.push(tokio::spawn(
                subscriber.clone().run(rpc.clone(), config.polling_interval),
            ));
            subscribers.push(subscriber);
        }
    }
    let venues = Arc::new(VenueRegistry::new(subscribers));

    let state = AppState {
        engine,
        provider,
        user_stats,
        vamm: vamm_map,
        venues,
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limit_calls_per_second)),
        metrics,
        commit: config.commit.clone(),
        allow_load_test: config.allow_load_test,
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    anyhow::bail!("http server stopped")
}
