//! Finalization-request queue: enqueue and batched-drain commit/dismiss
//! processing (component §4.E of the component design).

use ledger_core::constants::{
    ROOT_CREDITOR_ID, SC_INSUFFICIENT_AVAILABLE_AMOUNT, SC_OK, SC_TIMEOUT, SC_TOO_LOW_INTEREST_RATE,
};
use ledger_core::money::{is_reserved, saturating_add_principal};
use ledger_core::{AccountKey, FinalizationRequest, LedgerError, OutboundSignal, PendingBalanceChange, Timestamp};

use crate::engine::Engine;

impl Engine {
    pub async fn enqueue_finalization_request(
        &self,
        req: FinalizationRequest,
    ) -> Result<(), LedgerError> {
        if req.committed_amount < 0 {
            return Err(LedgerError::InvalidTransferRequest(
                "committed_amount must be >= 0".to_string(),
            ));
        }
        self.store.put_finalization_request(&req)
    }

    /// `committed_amount == 0` always dismisses with `OK`; any other value
    /// must clear the deadline, min-interest-rate, and expendable-or-
    /// reserved checks in that order, matching the reference status-code
    /// derivation exactly.
    fn calc_status_code(
        &self,
        req: &FinalizationRequest,
        prepared: &ledger_core::PreparedTransfer,
        expendable_amount: i64,
        interest_rate: f64,
        is_sender_root: bool,
        now: Timestamp,
    ) -> &'static str {
        if req.committed_amount == 0 {
            return SC_OK;
        }
        if now > prepared.deadline {
            return SC_TIMEOUT;
        }
        if interest_rate < prepared.min_interest_rate {
            return SC_TOO_LOW_INTEREST_RATE;
        }
        let is_expendable = req.committed_amount <= expendable_amount + prepared.locked_amount;
        let reserved = is_reserved(
            req.committed_amount,
            prepared.locked_amount,
            is_sender_root,
            prepared.demurrage_rate,
            prepared.prepared_at,
            now,
        );
        if !is_expendable && !reserved {
            return SC_INSUFFICIENT_AVAILABLE_AMOUNT;
        }
        SC_OK
    }

    pub async fn process_finalization_requests(
        &self,
        key: AccountKey,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let requests = self.store.iter_finalization_requests_for_account(&key)?;
        if requests.is_empty() {
            return Ok(());
        }

        let _guard = self.locks.lock(key).await;
        let mut account = match self.store.get_account(&key)? {
            Some(a) => a,
            None => {
                for req in &requests {
                    self.store.delete_finalization_request(&key, req.transfer_id)?;
                }
                return Ok(());
            }
        };

        for req in requests {
            self.store.delete_finalization_request(&key, req.transfer_id)?;

            let prepared = match self.store.get_prepared_transfer(&key, req.transfer_id)? {
                Some(p) => p,
                None => continue, // already finalized or never prepared; idempotent no-op
            };

            if prepared.coordinator != req.coordinator {
                self.store.delete_prepared_transfer(&key, req.transfer_id)?;
                account.total_locked_amount -= prepared.locked_amount;
                account.pending_transfers_count -= 1;
                self.store.put_account(&account)?;
                self.store.stage_outbound_signal(&OutboundSignal::FinalizedTransfer {
                    debtor_id: key.debtor_id,
                    sender_creditor_id: key.creditor_id,
                    transfer_id: req.transfer_id,
                    coordinator: req.coordinator.clone(),
                    committed_amount: 0,
                    status_code: SC_OK.to_string(),
                    ts: now,
                })?;
                continue;
            }

            let expendable_amount = account.expendable_amount(now);
            let is_sender_root = key.creditor_id == ROOT_CREDITOR_ID;
            let status = self.calc_status_code(
                &req,
                &prepared,
                expendable_amount,
                account.interest_rate,
                is_sender_root,
                now,
            );

            let committed_amount = if status == SC_OK { req.committed_amount } else { 0 };

            if status == SC_OK && committed_amount > 0 {
                let (new_principal, overflowed) =
                    saturating_add_principal(account.principal, -committed_amount);
                account.principal = new_principal;
                if overflowed {
                    account.set_overflown();
                }
                account.last_transfer_number += 1;
                account.last_transfer_committed_at = account.last_transfer_committed_at.max(now);
                self.store.stage_outbound_signal(&OutboundSignal::AccountTransfer {
                    debtor_id: key.debtor_id,
                    creditor_id: key.creditor_id,
                    transfer_number: account.last_transfer_number,
                    principal_delta: -committed_amount,
                    ts: now,
                })?;

                let change_id = self
                    .store
                    .next_change_id(&AccountKey::new(key.debtor_id, prepared.recipient_creditor_id))?;
                let pending = PendingBalanceChange {
                    debtor_id: key.debtor_id,
                    creditor_id: prepared.recipient_creditor_id,
                    other_creditor_id: key.creditor_id,
                    change_id,
                    coordinator_type: req.coordinator.coordinator_type.clone(),
                    transfer_note_format: req.transfer_note_format.clone(),
                    transfer_note: req.transfer_note.clone(),
                    committed_at: now,
                    principal_delta: committed_amount,
                };
                self.store.put_pending_balance_change(&pending)?;
                self.store.stage_outbound_signal(&OutboundSignal::PendingBalanceChange {
                    debtor_id: pending.debtor_id,
                    creditor_id: pending.creditor_id,
                    other_creditor_id: pending.other_creditor_id,
                    change_id: pending.change_id,
                    principal_delta: pending.principal_delta,
                    ts: now,
                })?;
            }

            self.store.delete_prepared_transfer(&key, req.transfer_id)?;
            account.total_locked_amount -= prepared.locked_amount;
            account.pending_transfers_count -= 1;
            self.store.put_account(&account)?;

            self.store.stage_outbound_signal(&OutboundSignal::FinalizedTransfer {
                debtor_id: key.debtor_id,
                sender_creditor_id: key.creditor_id,
                transfer_id: req.transfer_id,
                coordinator: req.coordinator,
                committed_amount,
                status_code: status.to_string(),
                ts: now,
            })?;
        }

        Ok(())
    }
}
