//! Transfer-request queue: enqueue and batched-drain prepare processing
//! (component §4.D of the component design).

use ledger_core::constants::{
    SC_INSUFFICIENT_AVAILABLE_AMOUNT, SC_RECIPIENT_IS_UNREACHABLE, SC_RECIPIENT_SAME_AS_SENDER,
    SC_SENDER_IS_UNREACHABLE, SC_TOO_LOW_INTEREST_RATE, SC_TOO_MANY_TRANSFERS,
};
use ledger_core::{AccountKey, LedgerError, OutboundSignal, PreparedTransfer, Timestamp, TransferRequest};

use crate::engine::Engine;

/// Per-account cap on simultaneously outstanding prepared transfers.
/// Generous enough to never bind ordinary traffic; exists so one runaway
/// coordinator can't monopolize an account's lock accounting forever.
const MAX_PENDING_TRANSFERS_PER_ACCOUNT: i32 = 1_000_000;

impl Engine {
    pub async fn enqueue_transfer_request(&self, req: TransferRequest) -> Result<(), LedgerError> {
        req.validate().map_err(LedgerError::InvalidTransferRequest)?;
        self.store.put_transfer_request(&req)
    }

    async fn reject(
        &self,
        debtor_id: i64,
        coordinator: ledger_core::CoordinatorTriple,
        status_code: &str,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.store.stage_outbound_signal(&OutboundSignal::RejectedTransfer {
            debtor_id,
            coordinator,
            status_code: status_code.to_string(),
            ts: now,
        })
    }

    /// Drain every queued transfer request for one sender account under a
    /// single lock acquisition — the batching that makes a high fan-in of
    /// concurrent prepare requests against one account affordable.
    pub async fn process_transfer_requests(
        &self,
        key: AccountKey,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let requests = self.store.iter_transfer_requests_for_account(&key)?;
        if requests.is_empty() {
            return Ok(());
        }

        let _guard = self.locks.lock(key).await;
        let mut account = match self.store.get_account(&key)? {
            Some(a) => a,
            None => {
                for req in &requests {
                    self.store
                        .delete_transfer_request(&key, req.transfer_request_id)?;
                    self.reject(req.debtor_id, req.coordinator.clone(), SC_SENDER_IS_UNREACHABLE, now)
                        .await?;
                }
                return Ok(());
            }
        };

        for req in requests {
            self.store
                .delete_transfer_request(&key, req.transfer_request_id)?;

            if account.is_deleted() {
                self.reject(req.debtor_id, req.coordinator.clone(), SC_SENDER_IS_UNREACHABLE, now)
                    .await?;
                continue;
            }
            let recipient_creditor_id = req.recipient_creditor_id;
            let reachable = match recipient_creditor_id {
                Some(id) => self.fetcher.is_reachable(req.debtor_id, id).await,
                None => false,
            };
            if !reachable {
                self.reject(req.debtor_id, req.coordinator.clone(), SC_RECIPIENT_IS_UNREACHABLE, now)
                    .await?;
                continue;
            }
            let recipient_creditor_id = recipient_creditor_id.expect("reachable implies Some");
            if recipient_creditor_id == key.creditor_id {
                self.reject(req.debtor_id, req.coordinator.clone(), SC_RECIPIENT_SAME_AS_SENDER, now)
                    .await?;
                continue;
            }
            if account.interest_rate < req.min_interest_rate {
                self.reject(req.debtor_id, req.coordinator.clone(), SC_TOO_LOW_INTEREST_RATE, now)
                    .await?;
                continue;
            }
            if account.pending_transfers_count >= MAX_PENDING_TRANSFERS_PER_ACCOUNT {
                self.reject(req.debtor_id, req.coordinator.clone(), SC_TOO_MANY_TRANSFERS, now)
                    .await?;
                continue;
            }

            let expendable = account.expendable_amount(now);
            let locked = expendable.min(req.max_locked_amount).max(0);
            if locked < req.min_locked_amount {
                self.reject(
                    req.debtor_id,
                    req.coordinator.clone(),
                    SC_INSUFFICIENT_AVAILABLE_AMOUNT,
                    now,
                )
                .await?;
                continue;
            }

            let transfer_id = account.next_transfer_id();
            let prepared = PreparedTransfer {
                debtor_id: req.debtor_id,
                sender_creditor_id: key.creditor_id,
                transfer_id,
                coordinator: req.coordinator.clone(),
                recipient_creditor_id: req.recipient_creditor_id,
                prepared_at: now,
                min_interest_rate: req.min_interest_rate,
                demurrage_rate: -1.0,
                deadline: req.deadline,
                locked_amount: locked,
                last_reminder_ts: None,
            };
            account.total_locked_amount += locked;
            account.pending_transfers_count += 1;

            self.store.put_prepared_transfer(&prepared)?;
            self.store.put_account(&account)?;
            self.store.stage_outbound_signal(&OutboundSignal::PreparedTransfer {
                debtor_id: prepared.debtor_id,
                sender_creditor_id: prepared.sender_creditor_id,
                transfer_id: prepared.transfer_id,
                coordinator: prepared.coordinator,
                recipient_creditor_id: prepared.recipient_creditor_id,
                locked_amount: prepared.locked_amount,
                deadline: prepared.deadline,
                ts: now,
            })?;
        }

        Ok(())
    }
}
