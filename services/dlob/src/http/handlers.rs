//! Request handlers for the DLOB query surface
//!
//! Handlers are pure readers: they resolve the market, clone the current
//! snapshot `Arc`, aggregate, and serialize. Every response reflects exactly
//! one snapshot. `/orders/json/raw` intentionally leaks raw numeric fields
//! for wire-compatible clients; `/orders/json` stringifies amounts and
//! names enums.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use types::market::MarketId;
use types::order::Order;
use types::Pubkey;

use crate::aggregator::{self, L2Request, DEPTH_UNLIMITED};
use crate::codec::{self, DlobOrder};
use crate::engine::book::{BookSide, MarketBook};
use crate::engine::DlobSnapshot;
use crate::http::error::AppError;
use crate::http::params::{parse_bool, parse_u64, resolve_market, BatchParams};
use crate::http::state::AppState;
use crate::vamm::VammGenerator;
use crate::venues::L2Generator;

const DEFAULT_DEPTH: i64 = 10;
const DEFAULT_NUM_VAMM_ORDERS: usize = 100;

// --- health & startup ------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Response {
    if state.is_healthy() {
        (StatusCode::OK, "OK").into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Unhealthy").into_response()
    }
}

pub async fn startup(State(state): State<AppState>) -> Result<Response, AppError> {
    if state.is_ready() {
        Ok((
            StatusCode::OK,
            Json(json!({"ready": true, "commit": state.commit})),
        )
            .into_response())
    } else {
        Err(AppError::NotReady)
    }
}

// --- raw order dumps -------------------------------------------------------

/// Everything the dump endpoints need from one snapshot pass.
fn collect_orders(state: &AppState, market: Option<MarketId>) -> Vec<DlobOrder> {
    let mut out = Vec::new();
    state.provider.for_each_account(&mut |pubkey, account| {
        for order in account.active_orders() {
            let order_market = MarketId {
                market_type: order.market_type,
                market_index: order.market_index,
            };
            if market.is_some_and(|wanted| wanted != order_market) {
                continue;
            }
            out.push(DlobOrder {
                user: *pubkey,
                order: *order,
            });
        }
    });
    out
}

fn oracles_json(state: &AppState, raw: bool) -> Vec<Value> {
    let mut oracles: Vec<(MarketId, types::oracle::OraclePriceData)> =
        state.engine.oracle_map().all();
    oracles.sort_by_key(|(market, _)| *market);
    oracles
        .into_iter()
        .map(|(market, data)| {
            if raw {
                json!({
                    "marketType": market.market_type,
                    "marketIndex": market.market_index,
                    "price": data.price,
                    "confidence": data.confidence,
                    "twap": data.twap,
                    "slot": data.slot,
                })
            } else {
                json!({
                    "marketType": market.market_type,
                    "marketIndex": market.market_index,
                    "price": data.price.to_string(),
                    "confidence": data.confidence.to_string(),
                    "twap": data.twap.to_string(),
                    "slot": data.slot,
                })
            }
        })
        .collect()
}

pub async fn orders_json_raw(State(state): State<AppState>) -> Json<Value> {
    let slot = state.engine.slot_source().current_slot();
    let orders: Vec<Value> = collect_orders(&state, None)
        .into_iter()
        .map(|entry| {
            json!({
                "user": entry.user.to_string(),
                // Raw numeric fields, verbatim
                "order": serde_json::to_value(entry.order).unwrap_or(Value::Null),
            })
        })
        .collect();
    Json(json!({
        "slot": slot,
        "oracles": oracles_json(&state, true),
        "orders": orders,
    }))
}

/// Stringified rendering of one order, enums by name.
fn named_order_json(order: &Order) -> Value {
    json!({
        "slot": order.slot.to_string(),
        "price": order.price.to_string(),
        "baseAssetAmount": order.base_asset_amount.to_string(),
        "baseAssetAmountFilled": order.base_asset_amount_filled.to_string(),
        "quoteAssetAmount": order.quote_asset_amount.to_string(),
        "quoteAssetAmountFilled": order.quote_asset_amount_filled.to_string(),
        "triggerPrice": order.trigger_price.to_string(),
        "auctionStartPrice": order.auction_start_price.to_string(),
        "auctionEndPrice": order.auction_end_price.to_string(),
        "maxTs": order.max_ts.to_string(),
        "oraclePriceOffset": order.oracle_price_offset.to_string(),
        "orderId": order.order_id,
        "userOrderId": order.user_order_id,
        "marketIndex": order.market_index,
        "status": order.status,
        "orderType": order.order_type,
        "marketType": order.market_type,
        "direction": order.direction,
        "existingPositionDirection": order.existing_position_direction,
        "reduceOnly": order.reduce_only,
        "postOnly": order.post_only,
        "immediateOrCancel": order.immediate_or_cancel,
        "triggerCondition": order.trigger_condition,
        "auctionDuration": order.auction_duration,
    })
}

pub async fn orders_json(State(state): State<AppState>) -> Json<Value> {
    let slot = state.engine.slot_source().current_slot();
    let orders: Vec<Value> = collect_orders(&state, None)
        .into_iter()
        .map(|entry| {
            json!({
                "user": entry.user.to_string(),
                "order": named_order_json(&entry.order),
            })
        })
        .collect();
    Json(json!({
        "slot": slot,
        "oracles": oracles_json(&state, false),
        "orders": orders,
    }))
}

pub async fn orders_idl(State(state): State<AppState>) -> Result<Response, AppError> {
    let orders = collect_orders(&state, None);
    let buffer = codec::encode_dlob_orders(&orders)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        buffer,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFilterQuery {
    market_name: Option<String>,
    market_type: Option<String>,
    market_index: Option<String>,
}

pub async fn orders_idl_with_slot(
    State(state): State<AppState>,
    Query(query): Query<MarketFilterQuery>,
) -> Result<Json<Value>, AppError> {
    // The market filter is optional here; apply it only when any selector
    // is present.
    let market = if query.market_name.is_some()
        || query.market_type.is_some()
        || query.market_index.is_some()
    {
        Some(resolve_market(
            state.registry(),
            query.market_name.as_deref(),
            query.market_type.as_deref(),
            query.market_index.as_deref(),
        )?)
    } else {
        None
    };

    let slot = state.engine.slot_source().current_slot();
    let orders = collect_orders(&state, market);
    let buffer = codec::encode_dlob_orders(&orders)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(Json(json!({
        "slot": slot,
        "data": BASE64.encode(buffer),
    })))
}

// --- topMakers -------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMakersQuery {
    market_name: Option<String>,
    market_type: Option<String>,
    market_index: Option<String>,
    side: Option<String>,
    limit: Option<String>,
    include_user_stats: Option<String>,
}

pub async fn top_makers(
    State(state): State<AppState>,
    Query(query): Query<TopMakersQuery>,
) -> Result<Json<Value>, AppError> {
    let market = resolve_market(
        state.registry(),
        query.market_name.as_deref(),
        query.market_type.as_deref(),
        query.market_index.as_deref(),
    )?;
    let side = query
        .side
        .as_deref()
        .and_then(BookSide::parse)
        .ok_or_else(|| AppError::bad_request("side must be bid or ask"))?;
    let limit = query
        .limit
        .as_deref()
        .map(|raw| parse_u64("limit", raw))
        .transpose()?
        .map(|v| v as usize);
    let include_user_stats = query
        .include_user_stats
        .as_deref()
        .map(|raw| parse_bool("includeUserStats", raw))
        .transpose()?
        .unwrap_or(false);

    let snapshot = state.engine.snapshot();
    let book = book_for(&snapshot, market);

    let provider = state.provider.clone();
    let makers = aggregator::top_makers(
        &book,
        side,
        limit,
        include_user_stats.then_some(state.user_stats.as_ref()),
        |user: &Pubkey| provider.get_user_account(user).map(|a| a.authority),
    );
    Ok(Json(serde_json::to_value(makers).unwrap_or(Value::Null)))
}

// --- L2 / L3 ---------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Query {
    market_name: Option<String>,
    market_type: Option<String>,
    market_index: Option<String>,
    depth: Option<String>,
    include_vamm: Option<String>,
    num_vamm_orders: Option<String>,
    include_phoenix: Option<String>,
    include_serum: Option<String>,
    grouping: Option<String>,
    include_oracle: Option<String>,
}

/// The market's book from this snapshot, or an empty book when no tick has
/// covered the market yet.
fn book_for(snapshot: &DlobSnapshot, market: MarketId) -> std::borrow::Cow<'_, MarketBook> {
    match snapshot.book(market) {
        Some(book) => std::borrow::Cow::Borrowed(book),
        None => std::borrow::Cow::Owned(MarketBook::new(market, snapshot.slot, None)),
    }
}

/// Resolve one L2 query against the given snapshot.
fn build_l2(
    state: &AppState,
    snapshot: &DlobSnapshot,
    query: &L2Query,
) -> Result<Value, AppError> {
    let market = resolve_market(
        state.registry(),
        query.market_name.as_deref(),
        query.market_type.as_deref(),
        query.market_index.as_deref(),
    )?;
    let book = book_for(snapshot, market);

    let depth = match query.depth.as_deref() {
        Some(raw) => {
            let parsed = parse_u64("depth", raw)?;
            i64::try_from(parsed).unwrap_or(DEPTH_UNLIMITED)
        }
        None => DEFAULT_DEPTH,
    };
    let num_vamm_orders = match query.num_vamm_orders.as_deref() {
        Some(raw) => parse_u64("numVammOrders", raw)? as usize,
        None => DEFAULT_NUM_VAMM_ORDERS,
    };
    let parse_flag = |name: &'static str, raw: &Option<String>| -> Result<bool, AppError> {
        raw.as_deref()
            .map(|v| parse_bool(name, v))
            .transpose()
            .map(|v| v.unwrap_or(false))
    };
    // Spot markets have no vAMM; the flag is silently ignored there.
    let include_vamm = if market.is_perp() {
        parse_flag("includeVamm", &query.include_vamm)?
    } else {
        false
    };
    let include_phoenix = !market.is_perp() && parse_flag("includePhoenix", &query.include_phoenix)?;
    let include_serum = !market.is_perp() && parse_flag("includeSerum", &query.include_serum)?;
    let include_oracle = parse_flag("includeOracle", &query.include_oracle)?;
    let grouping = query
        .grouping
        .as_deref()
        .map(|raw| parse_u64("grouping", raw))
        .transpose()?
        .filter(|g| *g > 0);

    let vamm_generator = include_vamm
        .then(|| state.vamm.get(market))
        .flatten()
        .map(|vamm_state| VammGenerator::new(market, vamm_state, num_vamm_orders));
    let phoenix = include_phoenix
        .then(|| state.venues.get(market, "phoenix"))
        .flatten();
    let serum = include_serum
        .then(|| state.venues.get(market, "serum"))
        .flatten();

    let mut generators: Vec<&dyn L2Generator> = Vec::new();
    if let Some(generator) = vamm_generator.as_ref() {
        generators.push(generator);
    }
    if let Some(subscriber) = phoenix.as_deref() {
        generators.push(subscriber);
    }
    if let Some(subscriber) = serum.as_deref() {
        generators.push(subscriber);
    }

    let l2 = aggregator::get_l2(
        &book,
        &L2Request {
            depth,
            grouping,
            generators,
            include_oracle,
        },
    );
    serde_json::to_value(&l2).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

pub async fn l2(
    State(state): State<AppState>,
    Query(query): Query<L2Query>,
) -> Result<Json<Value>, AppError> {
    let snapshot = state.engine.snapshot();
    Ok(Json(build_l2(&state, &snapshot, &query)?))
}

const BATCH_KEYS: [&str; 10] = [
    "marketName",
    "marketType",
    "marketIndex",
    "depth",
    "includeVamm",
    "numVammOrders",
    "includePhoenix",
    "includeSerum",
    "grouping",
    "includeOracle",
];

pub async fn batch_l2(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, AppError> {
    let params = BatchParams::new(pairs);
    let lists = params.normalize(&BATCH_KEYS)?;
    let batch_len = lists[0].len();

    // One snapshot for the whole batch: responses never interleave ticks.
    let snapshot = state.engine.snapshot();
    let mut l2s = Vec::with_capacity(batch_len);
    for i in 0..batch_len {
        let pick = |k: usize| lists[k][i].clone();
        let query = L2Query {
            market_name: pick(0),
            market_type: pick(1),
            market_index: pick(2),
            depth: pick(3),
            include_vamm: pick(4),
            num_vamm_orders: pick(5),
            include_phoenix: pick(6),
            include_serum: pick(7),
            grouping: pick(8),
            include_oracle: pick(9),
        };
        l2s.push(build_l2(&state, &snapshot, &query)?);
    }
    Ok(Json(json!({ "l2s": l2s })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Query {
    market_name: Option<String>,
    market_type: Option<String>,
    market_index: Option<String>,
    include_oracle: Option<String>,
}

pub async fn l3(
    State(state): State<AppState>,
    Query(query): Query<L3Query>,
) -> Result<Json<Value>, AppError> {
    let market = resolve_market(
        state.registry(),
        query.market_name.as_deref(),
        query.market_type.as_deref(),
        query.market_index.as_deref(),
    )?;
    let include_oracle = query
        .include_oracle
        .as_deref()
        .map(|raw| parse_bool("includeOracle", raw))
        .transpose()?
        .unwrap_or(false);

    let snapshot = state.engine.snapshot();
    let book = book_for(&snapshot, market);
    let l3 = aggregator::get_l3(&book, include_oracle);
    serde_json::to_value(&l3)
        .map(Json)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

