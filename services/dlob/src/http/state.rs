//! Shared application state for the HTTP surface

use std::sync::Arc;

use types::market::MarketRegistry;

use crate::engine::DlobEngine;
use crate::http::rate_limit::RateLimiter;
use crate::metrics::ServiceMetrics;
use crate::provider::DlobProvider;
use crate::user_stats::UserStatsIndex;
use crate::vamm::VammMap;
use crate::venues::VenueRegistry;

/// Slot staleness past which the health probe reports unhealthy.
pub const HEALTH_SLOT_STALENESS_SECS: u64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DlobEngine>,
    pub provider: Arc<dyn DlobProvider>,
    pub user_stats: Arc<UserStatsIndex>,
    pub vamm: Arc<VammMap>,
    pub venues: Arc<VenueRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<ServiceMetrics>,
    /// Build commit, reported verbatim.
    pub commit: String,
    pub allow_load_test: bool,
}

impl AppState {
    pub fn registry(&self) -> &Arc<MarketRegistry> {
        self.engine.registry()
    }

    /// Healthy means the slot feed is alive and reasonably fresh.
    pub fn is_healthy(&self) -> bool {
        match self.engine.slot_source().seconds_since_last_update() {
            Some(age) => age <= HEALTH_SLOT_STALENESS_SECS,
            None => false,
        }
    }

    /// Startup gate: subscribed with both indexes populated.
    pub fn is_ready(&self) -> bool {
        self.provider.is_subscribed()
            && self.provider.size() > 0
            && self.user_stats.size() > 0
    }
}
