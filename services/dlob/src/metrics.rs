//! In-process service counters
//!
//! Plain atomics read by logs and the health surface. Export plumbing lives
//! outside this service.

use std::sync::atomic::{AtomicU64, Ordering};

/// Core counters for the DLOB server.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    /// Book rebuild ticks completed.
    pub ticks_completed: AtomicU64,
    /// Ticks that failed and kept the previous snapshot.
    pub ticks_failed: AtomicU64,
    /// Orders skipped as malformed during a rebuild.
    pub orders_skipped: AtomicU64,
    /// Account updates applied to the index.
    pub account_updates: AtomicU64,
    /// HTTP requests served.
    pub requests_served: AtomicU64,
    /// Requests rejected by the rate limiter.
    pub requests_rate_limited: AtomicU64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick_failure(&self) {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_order_skipped(&self) {
        self.orders_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_account_update(&self) {
        self.account_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks_completed.load(Ordering::Relaxed)
    }
}
