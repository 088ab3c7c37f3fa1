//! Market discovery and state refresh
//!
//! Markets are static per process: one `getProgramAccounts` scan at startup
//! decodes every market account into the registry. After that a poll loop
//! refreshes the mutable slices of each market account — the oracle reading
//! and the AMM reserves — which feed the oracle view and the vAMM
//! generator. A failed refresh of one market is logged and skipped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use types::market::{MarketConfig, MarketRegistry};
use types::Pubkey;

use crate::codec;
use crate::oracle_map::OracleMap;
use crate::rpc::RpcClient;
use crate::slot::SlotSource;
use crate::vamm::{VammMap, VammState};

/// Scan the chain for market accounts and build the static registry.
pub async fn load_registry(
    rpc: &RpcClient,
    program: &Pubkey,
    oracle_map: &OracleMap,
    vamm_map: &VammMap,
) -> anyhow::Result<MarketRegistry> {
    let accounts = rpc.get_program_accounts(program).await?;
    let mut markets = Vec::new();
    for keyed in &accounts {
        let Ok(decoded) = codec::decode_market_account(&keyed.data) else {
            // Program accounts of other types (users, stats) land here too.
            continue;
        };
        apply_market_state(&decoded, oracle_map, vamm_map);
        markets.push(MarketConfig {
            name: decoded.name_str(),
            market_id: decoded.market_id(),
            market_account: keyed.pubkey,
            oracle: keyed.pubkey,
            phoenix_market: decoded.phoenix_market_pubkey(),
            serum_market: decoded.serum_market_pubkey(),
        });
    }
    info!(markets = markets.len(), "market registry loaded");
    Ok(MarketRegistry::new(markets))
}

/// Push one decoded market account into the oracle and vAMM views.
fn apply_market_state(
    decoded: &codec::MarketAccount,
    oracle_map: &OracleMap,
    vamm_map: &VammMap,
) {
    let id = decoded.market_id();
    oracle_map.update(id, decoded.oracle_price_data());
    if id.is_perp() {
        vamm_map.update(id, VammState::from(decoded));
    }
}

/// Keep oracle and vAMM state fresh for every registered market.
pub async fn run_poller(
    rpc: Arc<RpcClient>,
    registry: Arc<MarketRegistry>,
    oracle_map: Arc<OracleMap>,
    vamm_map: Arc<VammMap>,
    slot_source: Arc<SlotSource>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        for market in registry.all() {
            match rpc.get_account_data(&market.market_account).await {
                Ok(Some(data)) => match codec::decode_market_account(&data) {
                    Ok(decoded) => {
                        apply_market_state(&decoded, &oracle_map, &vamm_map);
                        slot_source.update(decoded.last_oracle_slot);
                    }
                    Err(error) => {
                        warn!(market = %market.market_id, %error, "market account failed to decode")
                    }
                },
                Ok(None) => {
                    warn!(market = %market.market_id, "market account missing on chain")
                }
                Err(error) => {
                    debug!(market = %market.market_id, %error, "market refresh failed");
                }
            }
        }
    }
}
