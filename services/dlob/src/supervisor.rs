//! Restart-on-crash supervision
//!
//! The whole service task is wrapped in a bounded loop: any failure tears
//! everything down, waits a fixed backoff, and rebuilds all subscriptions
//! and state from scratch. Recovery is deliberately coarse — partial-state
//! repair is harder to audit than a cold restart.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Fixed delay between restart attempts.
pub const RESTART_BACKOFF: Duration = Duration::from_secs(15);

/// Run `task` forever, restarting after [`RESTART_BACKOFF`] on any failure.
pub async fn supervise<F, Fut>(mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    loop {
        match task().await {
            Ok(()) => {
                // The service task is a daemon; returning at all is a fault.
                warn!("service task returned unexpectedly, restarting");
            }
            Err(err) => {
                error!(error = ?err, "service task failed, restarting");
            }
        }
        tokio::time::sleep(RESTART_BACKOFF).await;
    }
}
