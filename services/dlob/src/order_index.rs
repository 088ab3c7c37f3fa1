//! Flat keyed store of decoded user accounts
//!
//! The single owner of user-account state after insertion. Written only by
//! the account stream consumer; read concurrently by the book builder and
//! the raw-order handlers. Orderings are not maintained here and iteration
//! order is unspecified. A `get` of an absent key is a soft miss — no error
//! path reaches clients.

use std::collections::HashSet;

use dashmap::DashMap;
use types::account::UserAccount;
use types::Pubkey;

/// Concurrent map `account pubkey -> UserAccount`.
#[derive(Debug, Default)]
pub struct OrderIndex {
    accounts: DashMap<Pubkey, UserAccount>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Insert or replace the entry for `pubkey`.
    pub fn upsert(&self, pubkey: Pubkey, account: UserAccount) {
        self.accounts.insert(pubkey, account);
    }

    /// Remove the entry for `pubkey`, if present.
    pub fn delete(&self, pubkey: &Pubkey) {
        self.accounts.remove(pubkey);
    }

    pub fn get(&self, pubkey: &Pubkey) -> Option<UserAccount> {
        self.accounts.get(pubkey).map(|entry| entry.clone())
    }

    pub fn contains(&self, pubkey: &Pubkey) -> bool {
        self.accounts.contains_key(pubkey)
    }

    /// Visit every `(pubkey, account)` pair. Iteration order is unspecified.
    pub fn for_each(&self, mut f: impl FnMut(&Pubkey, &UserAccount)) {
        for entry in self.accounts.iter() {
            f(entry.key(), entry.value());
        }
    }

    /// Snapshot of all pubkeys currently present.
    pub fn pubkeys(&self) -> Vec<Pubkey> {
        self.accounts.iter().map(|entry| *entry.key()).collect()
    }

    /// Distinct authorities across all accounts.
    pub fn unique_authorities(&self) -> HashSet<Pubkey> {
        self.accounts
            .iter()
            .map(|entry| entry.value().authority)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
