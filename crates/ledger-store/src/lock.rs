//! Per-account async mutex map. Acquiring one account's lock serializes
//! every mutation of that account's row, which is what lets the queue
//! drain procedures batch many requests into one critical section.

use std::sync::Arc;

use dashmap::DashMap;
use ledger_core::AccountKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct AccountLocks {
    locks: DashMap<AccountKey, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, creating its entry on first use.
    /// Never holds two account locks at once from the same call site —
    /// cross-account effects always go through the balance-change inbox
    /// instead, by design (see the concurrency model).
    pub async fn lock(&self, key: AccountKey) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_serializes() {
        let locks = AccountLocks::new();
        let key = AccountKey::new(1, 2);
        let g1 = locks.lock(key).await;
        drop(g1);
        let _g2 = locks.lock(key).await;
    }
}
