//! Balance-change inbox: dedup + staged apply of peer-originated principal
//! deltas (component §4.F of the component design).

use ledger_core::money::saturating_add_principal;
use ledger_core::{AccountKey, LedgerError, OutboundSignal, PendingBalanceChange, RegisteredBalanceChange, Timestamp};

use crate::engine::Engine;

impl Engine {
    /// Two-phase ingestion: register for dedup first, then stage. A
    /// redelivered signal with an already-applied registration is dropped;
    /// one that's registered-but-not-yet-applied is treated as a retry and
    /// re-staged (staging is itself idempotent — same key overwrites).
    pub async fn on_pending_balance_change(
        &self,
        debtor_id: i64,
        creditor_id: i64,
        other_creditor_id: i64,
        change_id: i64,
        coordinator_type: String,
        transfer_note_format: String,
        transfer_note: String,
        committed_at: Timestamp,
        principal_delta: i64,
    ) -> Result<(), LedgerError> {
        if principal_delta == 0 {
            return Err(LedgerError::Other("principal_delta must be non-zero".to_string()));
        }

        if let Some(registered) =
            self.store.get_registered_balance_change(debtor_id, other_creditor_id, change_id)?
        {
            if registered.is_applied {
                tracing::debug!(debtor_id, other_creditor_id, change_id, "dropping duplicate balance change");
                return Ok(());
            }
        } else {
            self.store.put_registered_balance_change(&RegisteredBalanceChange {
                debtor_id,
                other_creditor_id,
                change_id,
                committed_at,
                is_applied: false,
            })?;
        }

        self.store.put_pending_balance_change(&PendingBalanceChange {
            debtor_id,
            creditor_id,
            other_creditor_id,
            change_id,
            coordinator_type,
            transfer_note_format,
            transfer_note,
            committed_at,
            principal_delta,
        })
    }

    /// Apply every pending delta addressed to one account, in commit order,
    /// under that account's lock.
    pub async fn process_pending_balance_changes(
        &self,
        debtor_id: i64,
        creditor_id: i64,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let key = AccountKey::new(debtor_id, creditor_id);
        let pending = self.store.iter_pending_balance_changes_for_account(debtor_id, creditor_id)?;
        if pending.is_empty() {
            return Ok(());
        }

        let _guard = self.locks.lock(key).await;
        let mut account = self.get_or_create_account(key, now)?;

        for change in pending {
            let (new_principal, overflowed) =
                saturating_add_principal(account.principal, change.principal_delta);
            account.principal = new_principal;
            if overflowed {
                account.set_overflown();
            }
            account.last_transfer_number += 1;
            account.last_transfer_committed_at = account.last_transfer_committed_at.max(change.committed_at);
            account.last_change_ts = now;
            account.last_change_seqnum += 1;

            self.store.put_registered_balance_change(&RegisteredBalanceChange {
                debtor_id: change.debtor_id,
                other_creditor_id: change.other_creditor_id,
                change_id: change.change_id,
                committed_at: change.committed_at,
                is_applied: true,
            })?;
            self.store
                .delete_pending_balance_change(change.debtor_id, change.creditor_id, change.change_id)?;

            self.store.stage_outbound_signal(&OutboundSignal::AccountTransfer {
                debtor_id,
                creditor_id,
                transfer_number: account.last_transfer_number,
                principal_delta: change.principal_delta,
                ts: now,
            })?;
        }

        self.store.put_account(&account)?;
        Ok(())
    }
}
