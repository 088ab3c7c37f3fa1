//! Per-IP request rate limiting
//!
//! Token bucket per client IP: capacity and refill both come from
//! `RATE_LIMIT_CALLS_PER_SECOND`. Exceeding the budget returns 429. A
//! designated load-test user agent bypasses the limiter when the operator
//! enables `ALLOW_LOAD_TEST`.

use std::time::Instant;

use dashmap::DashMap;

/// User agent that skips the limiter when load testing is allowed.
pub const LOAD_TEST_USER_AGENT: &str = "dlob-load-test";

#[derive(Clone)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    capacity: f64,
    refill_per_second: f64,
}

impl RateLimiter {
    pub fn new(calls_per_second: u32) -> Self {
        let rate = calls_per_second.max(1) as f64;
        Self {
            buckets: DashMap::new(),
            capacity: rate,
            refill_per_second: rate,
        }
    }

    /// Consume one token for `key`; `false` means over budget.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_update: now,
        });

        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = f64::min(self.capacity, bucket.tokens + elapsed * self.refill_per_second);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
