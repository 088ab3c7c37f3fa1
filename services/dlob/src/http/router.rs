//! Route table and middleware stack
//!
//! Requests arriving under `/dlob/...` have the prefix stripped before
//! routing so load balancers can route by path; an empty remainder becomes
//! `/`. The rate limiter keys on client IP (`x-forwarded-for` first, then
//! the socket address) and can be bypassed by the load-test user agent when
//! the operator allows it.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::error::AppError;
use crate::http::handlers;
use crate::http::rate_limit::LOAD_TEST_USER_AGENT;
use crate::http::state::AppState;

/// Path prefix stripped for load-balancer routing.
const DLOB_PREFIX: &str = "/dlob";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/startup", get(handlers::startup))
        .route("/orders/json/raw", get(handlers::orders_json_raw))
        .route("/orders/json", get(handlers::orders_json))
        .route("/orders/idl", get(handlers::orders_idl))
        .route("/orders/idlWithSlot", get(handlers::orders_idl_with_slot))
        .route("/topMakers", get(handlers::top_makers))
        .route("/l2", get(handlers::l2))
        .route("/batchL2", get(handlers::batch_l2))
        .route("/l3", get(handlers::l3))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn(strip_dlob_prefix))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rewrite `/dlob/x` to `/x` (and bare `/dlob` to `/`) before routing.
async fn strip_dlob_prefix(mut request: Request, next: Next) -> Response {
    let uri = request.uri();
    if let Some(rest) = uri.path().strip_prefix(DLOB_PREFIX) {
        let path = if rest.is_empty() { "/" } else { rest };
        let new_uri = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };
        if let Ok(parsed) = new_uri.parse() {
            *request.uri_mut() = parsed;
        }
    }
    next.run(request).await
}

/// Per-IP token bucket; 429 on exceed, optional load-test bypass.
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    state.metrics.record_request();

    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let load_test_bypass = state.allow_load_test && user_agent.starts_with(LOAD_TEST_USER_AGENT);

    if !load_test_bypass {
        let key = client_key(&request);
        if !state.rate_limiter.check(&key) {
            state.metrics.record_rate_limited();
            return Err(AppError::RateLimited);
        }
    }
    Ok(next.run(request).await)
}

/// Client identity for rate limiting: forwarded header, then socket address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
