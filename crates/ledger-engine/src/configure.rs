//! Account configuration and interest-rate-change capitalization
//! (component §4.G of the component design).

use ledger_core::constants::{
    CONFIG_DATA_MAX_BYTES, CONFIG_FLAGS_MASK, CONFIG_SCHEDULED_FOR_DELETION_FLAG, INTEREST_RATE_CEIL,
    INTEREST_RATE_FLOOR,
};
use ledger_core::{Account, AccountKey, LedgerError, OutboundSignal, Timestamp};

use crate::engine::Engine;

impl Engine {
    /// Apply a configure signal if its `(ts, seqnum)` is strictly newer than
    /// the account's last applied configuration; otherwise discard silently.
    /// Creates the account lazily on first configure.
    pub async fn configure_account(
        &self,
        key: AccountKey,
        ts: Timestamp,
        seqnum: u32,
        negligible_amount: f64,
        config_flags: i32,
        config_data: String,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if config_data.len() > CONFIG_DATA_MAX_BYTES {
            self.store.stage_outbound_signal(&OutboundSignal::RejectedConfig {
                debtor_id: key.debtor_id,
                creditor_id: key.creditor_id,
                reason: format!("config_data exceeds {CONFIG_DATA_MAX_BYTES} bytes"),
                ts: now,
            })?;
            return Ok(());
        }
        if config_flags & !CONFIG_FLAGS_MASK != 0 {
            self.store.stage_outbound_signal(&OutboundSignal::RejectedConfig {
                debtor_id: key.debtor_id,
                creditor_id: key.creditor_id,
                reason: format!("config_flags {config_flags:#x} has unrecognized bits set"),
                ts: now,
            })?;
            return Ok(());
        }

        let _guard = self.locks.lock(key).await;
        let mut account = self.get_or_create_account(key, now)?;

        if (ts, seqnum) <= (account.last_config_ts, account.last_config_seqnum) {
            tracing::debug!(%key, ts, seqnum, "discarding stale configure signal");
            return Ok(());
        }

        account.negligible_amount = negligible_amount;
        account.config_flags = config_flags;
        account.scheduled_for_deletion = config_flags & CONFIG_SCHEDULED_FOR_DELETION_FLAG != 0;
        account.config_data = config_data;
        account.last_config_ts = ts;
        account.last_config_seqnum = seqnum;
        account.last_change_ts = now;
        account.last_change_seqnum += 1;
        account.pending_account_update = true;

        self.store.put_account(&account)?;
        self.store.stage_outbound_signal(&OutboundSignal::AccountUpdate {
            debtor_id: key.debtor_id,
            creditor_id: key.creditor_id,
            last_change_seqnum: account.last_change_seqnum,
            principal: account.principal,
            interest_rate: account.interest_rate,
            ts: now,
        })?;
        Ok(())
    }

    /// Capitalize accrued interest into `principal`, then move `interest_rate`
    /// to `previous_interest_rate` and install `new_rate`. Root accounts are
    /// never rate-changed: they don't accrue interest in the first place.
    pub fn apply_interest_rate_change(account: &mut Account, new_rate: f64, now: Timestamp) {
        if account.is_root() {
            return;
        }
        let clamped = new_rate.clamp(INTEREST_RATE_FLOOR, INTEREST_RATE_CEIL);
        Self::capitalize_interest(account, now);
        account.previous_interest_rate = account.interest_rate;
        account.interest_rate = clamped;
        account.last_interest_rate_change_ts = now;
    }

    /// Fold accrued interest into `principal`, saturating on overflow.
    pub fn capitalize_interest(account: &mut Account, now: Timestamp) {
        if account.is_root() {
            return;
        }
        let current_balance = account.current_balance(now);
        let (new_principal, overflowed) =
            ledger_core::money::contain_principal_overflow(current_balance.round() as i128);
        account.interest = current_balance - new_principal as f64;
        account.principal = new_principal;
        if overflowed {
            account.set_overflown();
        }
        account.last_change_ts = now;
        account.last_interest_capitalization_ts = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_bus::{HttpPeerFetcher, InMemorySignalBus};
    use ledger_core::Configuration;
    use ledger_store::{AccountLocks, AccountStore};
    use std::sync::Arc;

    fn temp_engine() -> (Engine, tokio::sync::mpsc::Receiver<OutboundSignal>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(AccountStore::open(dir.path()).unwrap());
        let locks = Arc::new(AccountLocks::new());
        let (bus, rx) = InMemorySignalBus::new(64);
        let fetcher = Arc::new(HttpPeerFetcher::new("http://localhost:1".into(), 0.01, 1, 16));
        (Engine::new(store, locks, Arc::new(bus), fetcher, Configuration::default()), rx)
    }

    #[tokio::test]
    async fn configure_creates_account_lazily() {
        let (engine, _rx) = temp_engine();
        let key = AccountKey::new(-1, 1);
        engine
            .configure_account(key, 100, 1, 0.0, 0, String::new(), 100)
            .await
            .unwrap();
        let account = engine.store.get_account(&key).unwrap().unwrap();
        assert_eq!(account.last_config_ts, 100);
    }

    #[tokio::test]
    async fn stale_configure_is_discarded() {
        let (engine, _rx) = temp_engine();
        let key = AccountKey::new(-1, 1);
        engine
            .configure_account(key, 100, 2, 5.0, 0, "v2".into(), 100)
            .await
            .unwrap();
        engine
            .configure_account(key, 100, 1, 9.0, 0, "v1".into(), 200)
            .await
            .unwrap();
        let account = engine.store.get_account(&key).unwrap().unwrap();
        assert_eq!(account.negligible_amount, 5.0);
    }

    #[test]
    fn rate_change_capitalizes_then_moves_rate() {
        let mut account = Account::new(AccountKey::new(-1, 1), 0, 0);
        account.principal = 1000;
        account.interest_rate = 5.0;
        Engine::apply_interest_rate_change(&mut account, 10.0, 1_000_000);
        assert_eq!(account.previous_interest_rate, 5.0);
        assert_eq!(account.interest_rate, 10.0);
        assert_eq!(account.last_interest_rate_change_ts, 1_000_000);
    }
}
