//! The accounting engine: owns the store, the per-account lock map, and the
//! outbound collaborators, and exposes the operations each queue drain and
//! the scanner call. Mirrors the reference state engine's shape — validate,
//! stage mutations against an in-memory clone, commit, emit signals — but
//! generalized to two-phase transfers instead of a signed-transaction DAG.

use std::sync::Arc;

use ledger_bus::{PeerFetcher, SignalBus};
use ledger_core::{Account, AccountKey, Configuration, LedgerError, Timestamp};
use ledger_store::{AccountLocks, AccountStore};

pub struct Engine {
    pub store: Arc<AccountStore>,
    pub locks: Arc<AccountLocks>,
    pub bus: Arc<dyn SignalBus>,
    pub fetcher: Arc<dyn PeerFetcher>,
    pub config: Configuration,
}

impl Engine {
    pub fn new(
        store: Arc<AccountStore>,
        locks: Arc<AccountLocks>,
        bus: Arc<dyn SignalBus>,
        fetcher: Arc<dyn PeerFetcher>,
        config: Configuration,
    ) -> Self {
        Self { store, locks, bus, fetcher, config }
    }

    /// Days since 1970-01-01 UTC, used to seed `last_transfer_id`.
    pub(crate) fn creation_date_days(now: Timestamp) -> i64 {
        now.div_euclid(86_400)
    }

    /// Fetch an account, or create it with defaults if absent. Does not
    /// persist the new account — callers decide whether to.
    pub(crate) fn get_or_create_account(
        &self,
        key: AccountKey,
        now: Timestamp,
    ) -> Result<Account, LedgerError> {
        match self.store.get_account(&key)? {
            Some(account) => Ok(account),
            None => Ok(Account::new(key, now, Self::creation_date_days(now))),
        }
    }
}
