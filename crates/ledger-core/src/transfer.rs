//! Transfer pipeline data model: request, prepared reservation,
//! finalization decision, and the cross-account balance-change inbox.

use serde::{Deserialize, Serialize};

use crate::types::{CoordinatorTriple, CreditorId, DebtorId, Timestamp};

/// A queued prepare intent, not yet acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub transfer_request_id: i64,
    pub coordinator: CoordinatorTriple,
    pub min_locked_amount: i64,
    pub max_locked_amount: i64,
    /// `None` if the inbound recipient identifier did not parse into a
    /// creditor id — treated the same as an unreachable recipient.
    pub recipient_creditor_id: Option<CreditorId>,
    pub deadline: Timestamp,
    pub min_interest_rate: f64,
    pub ts: Timestamp,
}

impl TransferRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_locked_amount < 0 || self.min_locked_amount > self.max_locked_amount {
            return Err(format!(
                "min_locked_amount {} must be in [0, max_locked_amount {}]",
                self.min_locked_amount, self.max_locked_amount
            ));
        }
        if self.min_interest_rate < -100.0 {
            return Err(format!(
                "min_interest_rate {} below floor -100.0",
                self.min_interest_rate
            ));
        }
        Ok(())
    }
}

/// An accepted reservation against the sender's account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTransfer {
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub transfer_id: i64,
    pub coordinator: CoordinatorTriple,
    pub recipient_creditor_id: CreditorId,
    pub prepared_at: Timestamp,
    pub min_interest_rate: f64,
    /// In `(-100, 0]`: bounds the reserve's worst-case drift between
    /// prepare and finalize.
    pub demurrage_rate: f64,
    pub deadline: Timestamp,
    pub locked_amount: i64,
    /// `None` means no reminder has been sent yet.
    pub last_reminder_ts: Option<Timestamp>,
}

/// A commit or dismiss decision for a previously prepared transfer.
/// `committed_amount == 0` means dismiss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizationRequest {
    pub debtor_id: DebtorId,
    pub sender_creditor_id: CreditorId,
    pub transfer_id: i64,
    pub coordinator: CoordinatorTriple,
    pub committed_amount: i64,
    pub transfer_note_format: String,
    pub transfer_note: String,
    pub ts: Timestamp,
}

/// Idempotency ledger entry: one row per balance-change signal ever seen
/// for this account, regardless of whether it has been applied yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredBalanceChange {
    pub debtor_id: DebtorId,
    pub other_creditor_id: CreditorId,
    pub change_id: i64,
    pub committed_at: Timestamp,
    pub is_applied: bool,
}

/// A staged principal delta waiting to be applied to the target account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBalanceChange {
    pub debtor_id: DebtorId,
    /// The account this delta must be applied to.
    pub creditor_id: CreditorId,
    /// The counterparty on the other side of the originating transfer;
    /// together with `debtor_id` and `change_id` this is the dedup key.
    pub other_creditor_id: CreditorId,
    pub change_id: i64,
    pub coordinator_type: String,
    pub transfer_note_format: String,
    pub transfer_note: String,
    pub committed_at: Timestamp,
    /// Never zero: a no-op delta would not be worth delivering.
    pub principal_delta: i64,
}
