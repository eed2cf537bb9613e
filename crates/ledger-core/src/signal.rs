//! Inbound/outbound signal catalog. Inbound signals are what the bus
//! delivers to this service; outbound signals are what this service emits
//! for peers and coordinators to observe. Every outbound signal carries
//! either a coordinator triple or an account key so consumers can
//! correlate it with the request that produced it.

use serde::{Deserialize, Serialize};

use crate::types::{CoordinatorTriple, CreditorId, DebtorId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundSignal {
    ConfigureAccount {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        ts: Timestamp,
        seqnum: u32,
        negligible_amount: f64,
        config_flags: i32,
        config_data: String,
    },
    PrepareTransfer {
        coordinator: CoordinatorTriple,
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        min_locked_amount: i64,
        max_locked_amount: i64,
        recipient_identifier: String,
        min_interest_rate: f64,
        max_commit_delay: i64,
        ts: Timestamp,
    },
    FinalizeTransfer {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        transfer_id: i64,
        coordinator: CoordinatorTriple,
        committed_amount: i64,
        transfer_note_format: String,
        transfer_note: String,
        ts: Timestamp,
    },
    PendingBalanceChange {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        other_creditor_id: CreditorId,
        change_id: i64,
        coordinator_type: String,
        transfer_note_format: String,
        transfer_note: String,
        committed_at: Timestamp,
        principal_delta: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundSignal {
    RejectedTransfer {
        debtor_id: DebtorId,
        coordinator: CoordinatorTriple,
        status_code: String,
        ts: Timestamp,
    },
    PreparedTransfer {
        debtor_id: DebtorId,
        sender_creditor_id: CreditorId,
        transfer_id: i64,
        coordinator: CoordinatorTriple,
        recipient_creditor_id: CreditorId,
        locked_amount: i64,
        deadline: Timestamp,
        ts: Timestamp,
    },
    FinalizedTransfer {
        debtor_id: DebtorId,
        sender_creditor_id: CreditorId,
        transfer_id: i64,
        coordinator: CoordinatorTriple,
        committed_amount: i64,
        status_code: String,
        ts: Timestamp,
    },
    AccountTransfer {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        transfer_number: i64,
        principal_delta: i64,
        ts: Timestamp,
    },
    AccountUpdate {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        last_change_seqnum: u32,
        principal: i64,
        interest_rate: f64,
        ts: Timestamp,
    },
    AccountPurge {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        ts: Timestamp,
    },
    RejectedConfig {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        reason: String,
        ts: Timestamp,
    },
    PendingBalanceChange {
        debtor_id: DebtorId,
        creditor_id: CreditorId,
        other_creditor_id: CreditorId,
        change_id: i64,
        principal_delta: i64,
        ts: Timestamp,
    },
}
