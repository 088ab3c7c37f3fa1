//! Authority -> user-stats index
//!
//! Secondary map consulted only by `/topMakers?includeUserStats=true`.
//! Entries are derived lazily on first request for an authority; the stats
//! account address is a deterministic program derivation from the authority
//! key.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use types::account::UserStatsAccount;
use types::Pubkey;

/// Seed prefix for the stats account derivation.
const USER_STATS_SEED: &[u8] = b"user_stats";

/// Derive the stats account pubkey for an authority.
pub fn user_stats_pubkey(authority: &Pubkey) -> Pubkey {
    let mut hasher = Sha256::new();
    hasher.update(USER_STATS_SEED);
    hasher.update(authority.to_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Pubkey::new_from_array(bytes)
}

/// Lazily-populated map `authority -> (stats pubkey, stats account)`.
#[derive(Debug, Default)]
pub struct UserStatsIndex {
    stats: DashMap<Pubkey, (Pubkey, UserStatsAccount)>,
}

impl UserStatsIndex {
    pub fn new() -> Self {
        Self {
            stats: DashMap::new(),
        }
    }

    /// Get the stats entry for an authority, deriving it on first access.
    pub fn must_get(&self, authority: &Pubkey) -> (Pubkey, UserStatsAccount) {
        if let Some(entry) = self.stats.get(authority) {
            return *entry.value();
        }
        let derived = (user_stats_pubkey(authority), UserStatsAccount::new(*authority));
        // Another task may have raced the derivation; keep whichever landed.
        *self
            .stats
            .entry(*authority)
            .or_insert(derived)
            .value()
    }

    /// Replace the stored stats account for an authority.
    pub fn update(&self, authority: Pubkey, account: UserStatsAccount) {
        let pubkey = user_stats_pubkey(&authority);
        self.stats.insert(authority, (pubkey, account));
    }

    pub fn size(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
