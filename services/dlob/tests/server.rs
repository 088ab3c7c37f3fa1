//! End-to-end tests for the HTTP query surface
//!
//! Builds the full application state around an in-memory account fixture,
//! runs real book rebuilds, and exercises the router with oneshot requests.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use dlob_server::codec;
use dlob_server::engine::DlobEngine;
use dlob_server::http::rate_limit::{RateLimiter, LOAD_TEST_USER_AGENT};
use dlob_server::http::{create_router, AppState};
use dlob_server::metrics::ServiceMetrics;
use dlob_server::oracle_map::OracleMap;
use dlob_server::order_index::OrderIndex;
use dlob_server::provider::DlobProvider;
use dlob_server::slot::SlotSource;
use dlob_server::user_stats::UserStatsIndex;
use dlob_server::vamm::VammMap;
use dlob_server::venues::VenueRegistry;
use types::account::UserAccount;
use types::market::{MarketConfig, MarketId, MarketRegistry, MarketType};
use types::numeric::{BASE_PRECISION, PRICE_PRECISION};
use types::oracle::OraclePriceData;
use types::order::{Direction, Order, OrderStatus, OrderType};
use types::Pubkey;

/// Provider stub over the shared order index; no chain behind it.
struct StubProvider {
    index: Arc<OrderIndex>,
    subscribed: bool,
}

#[async_trait::async_trait]
impl DlobProvider for StubProvider {
    async fn subscribe(self: Arc<Self>) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        Ok(tokio::spawn(async {}))
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    fn size(&self) -> usize {
        self.index.size()
    }

    fn get_user_account(&self, pubkey: &Pubkey) -> Option<UserAccount> {
        self.index.get(pubkey)
    }

    fn for_each_account(&self, f: &mut dyn FnMut(&Pubkey, &UserAccount)) {
        self.index.for_each(|pubkey, account| f(pubkey, account));
    }

    fn unique_authorities(&self) -> HashSet<Pubkey> {
        self.index.unique_authorities()
    }
}

struct Fixture {
    state: AppState,
    index: Arc<OrderIndex>,
    engine: Arc<DlobEngine>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_rate_limit(1_000)
    }

    fn with_rate_limit(calls_per_second: u32) -> Self {
        let index = Arc::new(OrderIndex::new());
        let oracle_map = Arc::new(OracleMap::new());
        let slot_source = Arc::new(SlotSource::new());
        let registry = Arc::new(MarketRegistry::new(vec![
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
        ]));
        let metrics = Arc::new(ServiceMetrics::new());
        let engine = Arc::new(DlobEngine::new(
            index.clone(),
            oracle_map,
            slot_source,
            registry,
            metrics.clone(),
        ));
        let state = AppState {
            engine: engine.clone(),
            provider: Arc::new(StubProvider {
                index: index.clone(),
                subscribed: true,
            }),
            user_stats: Arc::new(UserStatsIndex::new()),
            vamm: Arc::new(VammMap::new()),
            venues: Arc::new(VenueRegistry::default()),
            rate_limiter: Arc::new(RateLimiter::new(calls_per_second)),
            metrics,
            commit: "test".to_string(),
            allow_load_test: true,
        };
        Self {
            state,
            index,
            engine,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    fn add_account(&self, orders: &[Order]) -> Pubkey {
        let pubkey = Pubkey::new_unique();
        let mut account = UserAccount::new(Pubkey::new_unique(), 0);
        for (slot, order) in account.orders.iter_mut().zip(orders) {
            *slot = *order;
        }
        account.open_orders = orders.iter().filter(|o| o.is_open()).count() as u8;
        self.index.upsert(pubkey, account);
        pubkey
    }

    fn tick(&self, slot: u64) {
        self.engine.slot_source().update(slot);
        assert!(self.engine.rebuild());
    }
}

fn perp_limit(direction: Direction, price: u64, size: u64, slot: u64, order_id: u32) -> Order {
    Order {
        status: OrderStatus::Open,
        order_type: OrderType::Limit,
        direction,
        market_type: MarketType::Perp,
        market_index: 0,
        price,
        base_asset_amount: size,
        slot,
        order_id,
        ..Order::default()
    }
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn empty_book_returns_empty_sides() {
    let fixture = Fixture::new();
    fixture.tick(42);

    let (status, json) =
        get_json(fixture.router(), "/l2?marketType=perp&marketIndex=0&depth=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bids"], serde_json::json!([]));
    assert_eq!(json["asks"], serde_json::json!([]));
    assert_eq!(json["slot"], serde_json::json!(42));
}

#[tokio::test]
async fn single_resting_bid_is_reported_scaled() {
    let fixture = Fixture::new();
    fixture.add_account(&[perp_limit(
        Direction::Long,
        100 * PRICE_PRECISION,
        5 * BASE_PRECISION,
        10,
        1,
    )]);
    fixture.tick(100);

    let (status, json) =
        get_json(fixture.router(), "/l2?marketType=perp&marketIndex=0&depth=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["bids"],
        serde_json::json!([{
            "price": "100000000",
            "size": "5000000000",
            "sources": {"dlob": "5000000000"}
        }])
    );
    assert_eq!(json["asks"], serde_json::json!([]));
}

#[tokio::test]
async fn auction_order_interpolates_by_slot() {
    let fixture = Fixture::new();
    let mut order = perp_limit(Direction::Long, 0, BASE_PRECISION, 1000, 1);
    order.order_type = OrderType::Market;
    order.auction_start_price = (110 * PRICE_PRECISION) as i64;
    order.auction_end_price = (100 * PRICE_PRECISION) as i64;
    order.auction_duration = 10;
    fixture.add_account(&[order]);
    fixture.tick(1005);

    let (status, json) =
        get_json(fixture.router(), "/l2?marketType=perp&marketIndex=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bids"][0]["price"], serde_json::json!("105000000"));
}

#[tokio::test]
async fn init_order_slots_never_appear() {
    let fixture = Fixture::new();
    // Two open orders; the remaining 30 slots stay Init
    fixture.add_account(&[
        perp_limit(Direction::Long, 99 * PRICE_PRECISION, BASE_PRECISION, 10, 1),
        perp_limit(Direction::Short, 101 * PRICE_PRECISION, BASE_PRECISION, 10, 2),
    ]);
    fixture.tick(50);

    let (status, json) = get_json(fixture.router(), "/orders/json").await;
    assert_eq!(status, StatusCode::OK);
    let orders = json["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    for entry in orders {
        assert_ne!(entry["order"]["status"], serde_json::json!("init"));
    }

    let (_, raw) = get_json(fixture.router(), "/orders/json/raw").await;
    assert_eq!(raw["orders"].as_array().unwrap().len(), 2);
    // Raw view leaks numeric fields as JSON numbers
    assert!(raw["orders"][0]["order"]["price"].is_u64());
}

#[tokio::test]
async fn grouping_buckets_asks_upward() {
    let fixture = Fixture::new();
    let orders: Vec<Order> = (0..4)
        .map(|i| perp_limit(Direction::Short, 101 + i, 1, 10, i as u32 + 1))
        .collect();
    fixture.add_account(&orders);
    fixture.tick(50);

    let (status, json) = get_json(
        fixture.router(),
        "/l2?marketType=perp&marketIndex=0&depth=10&grouping=10",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let asks = json["asks"].as_array().unwrap();
    assert_eq!(asks.len(), 1);
    assert_eq!(asks[0]["price"], serde_json::json!("110"));
    assert_eq!(asks[0]["size"], serde_json::json!("4"));
}

#[tokio::test]
async fn top_makers_lists_each_maker_once() {
    let fixture = Fixture::new();
    let maker = fixture.add_account(&[
        perp_limit(Direction::Long, 99 * PRICE_PRECISION, BASE_PRECISION, 10, 1),
        perp_limit(Direction::Long, 98 * PRICE_PRECISION, BASE_PRECISION, 10, 2),
        perp_limit(Direction::Long, 97 * PRICE_PRECISION, BASE_PRECISION, 10, 3),
    ]);
    fixture.tick(50);

    let (status, json) = get_json(
        fixture.router(),
        "/topMakers?marketType=perp&marketIndex=0&side=bid&limit=10",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([maker.to_string()]));
}

#[tokio::test]
async fn top_makers_respects_limit_and_stats() {
    let fixture = Fixture::new();
    for i in 0..3 {
        fixture.add_account(&[perp_limit(
            Direction::Short,
            (101 + i) * PRICE_PRECISION,
            BASE_PRECISION,
            10,
            1,
        )]);
    }
    fixture.tick(50);

    let (_, json) = get_json(
        fixture.router(),
        "/topMakers?marketName=sol-perp&side=ask&limit=2",
    )
    .await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, with_stats) = get_json(
        fixture.router(),
        "/topMakers?marketName=SOL-PERP&side=ask&limit=1&includeUserStats=true",
    )
    .await;
    let pair = with_stats[0].as_array().unwrap();
    assert_eq!(pair.len(), 2);
    assert!(fixture.state.user_stats.size() > 0);
}

#[tokio::test]
async fn l3_lists_resting_orders_individually() {
    let fixture = Fixture::new();
    let maker = fixture.add_account(&[
        perp_limit(Direction::Long, 99 * PRICE_PRECISION, 2 * BASE_PRECISION, 10, 1),
        perp_limit(Direction::Long, 99 * PRICE_PRECISION, BASE_PRECISION, 11, 2),
    ]);
    fixture.tick(50);

    let (status, json) =
        get_json(fixture.router(), "/l3?marketType=perp&marketIndex=0").await;
    assert_eq!(status, StatusCode::OK);
    let bids = json["bids"].as_array().unwrap();
    assert_eq!(bids.len(), 2);
    assert_eq!(bids[0]["maker"], serde_json::json!(maker.to_string()));
    // Same price: earlier posting slot first
    assert_eq!(bids[0]["orderId"], serde_json::json!(1));
    assert_eq!(bids[1]["orderId"], serde_json::json!(2));
}

#[tokio::test]
async fn l2_sides_stay_sorted() {
    let fixture = Fixture::new();
    for i in 0..6u32 {
        fixture.add_account(&[
            perp_limit(Direction::Long, (90 + i as u64) * PRICE_PRECISION, 1, 10, 1),
            perp_limit(Direction::Short, (110 - i as u64) * PRICE_PRECISION, 1, 10, 2),
        ]);
    }
    fixture.tick(50);

    let (_, json) = get_json(
        fixture.router(),
        "/l2?marketType=perp&marketIndex=0&depth=20",
    )
    .await;
    let prices = |side: &str| -> Vec<u64> {
        json[side]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["price"].as_str().unwrap().parse().unwrap())
            .collect()
    };
    let bids = prices("bids");
    let asks = prices("asks");
    assert!(bids.windows(2).all(|w| w[0] >= w[1]));
    assert!(asks.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn batch_l2_normalizes_lists() {
    let fixture = Fixture::new();
    fixture.add_account(&[perp_limit(
        Direction::Long,
        100 * PRICE_PRECISION,
        BASE_PRECISION,
        10,
        1,
    )]);
    fixture.tick(50);

    let (status, json) = get_json(
        fixture.router(),
        "/batchL2?marketType=perp,spot&marketIndex=0,1&depth=5,5",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let l2s = json["l2s"].as_array().unwrap();
    assert_eq!(l2s.len(), 2);
    assert_eq!(l2s[0]["bids"].as_array().unwrap().len(), 1);
    assert_eq!(l2s[1]["bids"], serde_json::json!([]));
}

#[tokio::test]
async fn batch_l2_rejects_mismatched_lengths() {
    let fixture = Fixture::new();
    fixture.tick(50);

    let (status, _) = get_json(
        fixture.router(),
        "/batchL2?marketType=perp,spot&marketIndex=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn market_validation_errors_are_400() {
    let fixture = Fixture::new();
    fixture.tick(50);

    for uri in [
        "/l2?marketName=BTC-PERP",
        "/l2?marketType=swap&marketIndex=0",
        "/l2?marketType=perp",
        "/l2",
        "/topMakers?marketType=perp&marketIndex=0&side=sideways",
    ] {
        let (status, _) = get_json(fixture.router(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected 400 for {uri}");
    }
}

#[tokio::test]
async fn dlob_prefix_is_stripped() {
    let fixture = Fixture::new();
    fixture.tick(50);

    let (status, json) = get_json(
        fixture.router(),
        "/dlob/l2?marketType=perp&marketIndex=0",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slot"], serde_json::json!(50));

    // Bare prefix routes to the health handler at "/"
    let response = fixture
        .router()
        .oneshot(Request::get("/dlob").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_and_startup_probes() {
    let fixture = Fixture::new();

    // No slot observed yet: unhealthy, not ready
    let response = fixture
        .router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = get_json(fixture.router(), "/startup").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Populate everything the startup gate checks
    fixture.add_account(&[perp_limit(
        Direction::Long,
        100 * PRICE_PRECISION,
        BASE_PRECISION,
        10,
        1,
    )]);
    fixture.state.user_stats.must_get(&Pubkey::new_unique());
    fixture.tick(50);

    let response = fixture
        .router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, json) = get_json(fixture.router(), "/startup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["commit"], serde_json::json!("test"));
    assert!(fixture.engine.has_published_nonempty());
}

#[tokio::test]
async fn idl_endpoints_round_trip() {
    let fixture = Fixture::new();
    fixture.add_account(&[
        perp_limit(Direction::Long, 99 * PRICE_PRECISION, BASE_PRECISION, 10, 7),
    ]);
    fixture.tick(50);

    let response = fixture
        .router()
        .oneshot(Request::get("/orders/idl").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let decoded = codec::decode_dlob_orders(&bytes).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].order.order_id, 7);

    let (status, json) = get_json(
        fixture.router(),
        "/orders/idlWithSlot?marketType=perp&marketIndex=0",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slot"], serde_json::json!(50));
    use base64::Engine as _;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(json["data"].as_str().unwrap())
        .unwrap();
    let decoded = codec::decode_dlob_orders(&raw).unwrap();
    assert_eq!(decoded[0].order.order_id, 7);
}

#[tokio::test]
async fn rate_limiter_returns_429() {
    let fixture = Fixture::with_rate_limit(1);
    fixture.tick(50);
    let router = fixture.router();

    let first = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // The load-test user agent bypasses the limiter
    let bypassed = router
        .oneshot(
            Request::get("/health")
                .header(header::USER_AGENT, format!("{LOAD_TEST_USER_AGENT}/1.0"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(bypassed.status(), StatusCode::OK);
}
