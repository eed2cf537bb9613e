//! Periodic scanner: walks the account and prepared-transfer keyspaces in
//! bounded blocks, issuing heartbeats, capitalizing interest, attempting
//! deletions, sending reminders, and force-dismissing overdue prepared
//! transfers (component §4.H of the component design).

use std::sync::Arc;
use std::time::Duration;

use ledger_core::constants::COORDINATOR_TYPE_INTEREST;
use ledger_core::money::is_negligible_balance;
use ledger_core::{AccountKey, CoordinatorTriple, FinalizationRequest, LedgerError, OutboundSignal, Timestamp};

use crate::engine::Engine;

impl Engine {
    fn is_due(last: Timestamp, now: Timestamp, interval_days: f64) -> bool {
        (now - last) as f64 >= interval_days * 86_400.0
    }

    /// One pass over every account: heartbeat, interest capitalization,
    /// and deletion attempt, in that order.
    pub async fn scan_accounts_once(&self, now: Timestamp) -> Result<(), LedgerError> {
        let mut after = None;
        loop {
            let batch = self
                .store
                .scan_accounts(after, self.config.accounts_scan_blocks_per_query as usize)?;
            if batch.is_empty() {
                break;
            }
            after = batch.last().map(|a| a.key);

            for account in &batch {
                self.scan_one_account(account.key, now).await?;
                tokio::time::sleep(Duration::from_millis(self.config.accounts_scan_beat_millisecs)).await;
            }
        }
        Ok(())
    }

    async fn scan_one_account(&self, key: AccountKey, now: Timestamp) -> Result<(), LedgerError> {
        let _guard = self.locks.lock(key).await;
        let mut account = match self.store.get_account(&key)? {
            Some(a) => a,
            None => return Ok(()),
        };

        if Self::is_due(account.last_heartbeat_ts, now, self.config.account_heartbeat_days) {
            account.last_heartbeat_ts = now;
            self.store.stage_outbound_signal(&OutboundSignal::AccountUpdate {
                debtor_id: key.debtor_id,
                creditor_id: key.creditor_id,
                last_change_seqnum: account.last_change_seqnum,
                principal: account.principal,
                interest_rate: account.interest_rate,
                ts: now,
            })?;
        }

        if !account.is_root() {
            if let Some(root_config) = self.fetcher.get_root_config(key.debtor_id).await {
                if root_config.interest_rate != account.interest_rate {
                    Self::apply_interest_rate_change(&mut account, root_config.interest_rate, now);
                }
            }

            let balance = account.current_balance(now);
            let ratio = (balance - account.principal as f64).abs() / account.principal.unsigned_abs().max(1) as f64;
            if Self::is_due(
                account.last_interest_capitalization_ts,
                now,
                self.config.min_interest_capitalization_days,
            ) && ratio >= self.config.max_interest_to_principal_ratio
            {
                Self::capitalize_interest(&mut account, now);
            }
        }

        if account.scheduled_for_deletion
            && account.pending_transfers_count == 0
            && is_negligible_balance(account.current_balance(now), account.negligible_amount)
            && Self::is_due(account.last_deletion_attempt_ts, now, self.config.deletion_attempts_min_days)
        {
            self.store.delete_account(&key)?;
            self.store.stage_outbound_signal(&OutboundSignal::AccountPurge {
                debtor_id: key.debtor_id,
                creditor_id: key.creditor_id,
                ts: now,
            })?;
            return Ok(());
        }

        self.store.put_account(&account)?;
        Ok(())
    }

    /// One pass over every prepared transfer: force-dismiss past-deadline
    /// reservations, send reminders for long-lived ones still within their
    /// deadline.
    pub async fn scan_prepared_transfers_once(&self, now: Timestamp) -> Result<(), LedgerError> {
        let transfers = self
            .store
            .iter_all_prepared_transfers(usize::MAX)?;

        for t in transfers {
            let key = AccountKey::new(t.debtor_id, t.sender_creditor_id);
            if now > t.deadline {
                self.enqueue_finalization_request(FinalizationRequest {
                    debtor_id: t.debtor_id,
                    sender_creditor_id: t.sender_creditor_id,
                    transfer_id: t.transfer_id,
                    coordinator: CoordinatorTriple {
                        coordinator_type: COORDINATOR_TYPE_INTEREST.to_string(),
                        coordinator_id: 0,
                        coordinator_request_id: 0,
                    },
                    committed_amount: 0,
                    transfer_note_format: String::new(),
                    transfer_note: String::new(),
                    ts: now,
                })
                .await?;
                self.process_finalization_requests(key, now).await?;
                continue;
            }

            let last = t.last_reminder_ts.unwrap_or(t.prepared_at);
            if Self::is_due(last, now, self.config.prepared_transfer_reminder_days) {
                let mut updated = t.clone();
                updated.last_reminder_ts = Some(now);
                self.store.put_prepared_transfer(&updated)?;
                self.store.stage_outbound_signal(&OutboundSignal::PreparedTransfer {
                    debtor_id: updated.debtor_id,
                    sender_creditor_id: updated.sender_creditor_id,
                    transfer_id: updated.transfer_id,
                    coordinator: updated.coordinator,
                    recipient_creditor_id: updated.recipient_creditor_id,
                    locked_amount: updated.locked_amount,
                    deadline: updated.deadline,
                    ts: now,
                })?;
            }
        }
        Ok(())
    }
}

/// Spawn the two independent scanner loops, mirroring how the reference
/// node runs its subsystems as independent `tokio::task`s.
pub fn spawn_scanners(engine: Arc<Engine>) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
    let accounts_engine = engine.clone();
    let accounts_handle = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs_f64(accounts_engine.config.accounts_scan_hours * 3600.0));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = accounts_engine.scan_accounts_once(now).await {
                tracing::warn!(error = %e, "account scan pass failed");
            }
        }
    });

    let transfers_engine = engine;
    let transfers_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(
            transfers_engine.config.prepared_transfers_scan_days * 86_400.0,
        ));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = transfers_engine.scan_prepared_transfers_once(now).await {
                tracing::warn!(error = %e, "prepared transfer scan pass failed");
            }
        }
    });

    (accounts_handle, transfers_handle)
}
