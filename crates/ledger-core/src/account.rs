//! The account aggregate: balance, interest-rate state, lock accounting,
//! and configuration. One row per `(debtor_id, creditor_id)`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INTEREST_RATE, DEFAULT_NEGLIGIBLE_AMOUNT, ROOT_CREDITOR_ID, STATUS_DELETED_FLAG,
    STATUS_OVERFLOWN_FLAG,
};
use crate::money::calc_current_balance;
use crate::types::{initial_transfer_id, AccountKey, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub key: AccountKey,

    /// Days since 1970-01-01 UTC that this account row was (re-)created.
    pub creation_date: i64,
    pub last_change_seqnum: u32,
    pub last_change_ts: Timestamp,

    /// Settled balance. Never equals `MIN_INT64`; saturates instead of
    /// wrapping on overflow (see [`STATUS_OVERFLOWN_FLAG`]).
    pub principal: i64,
    /// Interest accrued but not yet folded into `principal`.
    pub interest: f64,
    pub interest_rate: f64,
    pub previous_interest_rate: f64,
    pub last_interest_rate_change_ts: Timestamp,

    pub last_config_ts: Timestamp,
    pub last_config_seqnum: u32,
    pub negligible_amount: f64,
    pub config_flags: i32,
    pub config_data: String,

    pub debtor_info_iri: Option<String>,
    pub debtor_info_content_type: Option<String>,
    pub debtor_info_sha256: Option<[u8; 32]>,

    pub status_flags: i32,

    pub total_locked_amount: i64,
    pub pending_transfers_count: i32,
    pub last_transfer_id: i64,
    pub last_transfer_number: i64,
    pub last_transfer_committed_at: Timestamp,

    pub last_heartbeat_ts: Timestamp,
    pub last_interest_capitalization_ts: Timestamp,
    pub last_deletion_attempt_ts: Timestamp,
    #[serde(default)]
    pub pending_account_update: bool,

    /// Derived from `config_flags`'s `CONFIG_SCHEDULED_FOR_DELETION_FLAG` bit.
    /// `#[serde(default)]` lets rows written before this field existed load
    /// as `false` rather than failing deserialization.
    #[serde(default)]
    pub scheduled_for_deletion: bool,
}

impl Account {
    pub fn new(key: AccountKey, now: Timestamp, creation_date_days: i64) -> Self {
        Self {
            key,
            creation_date: creation_date_days,
            last_change_seqnum: 0,
            last_change_ts: now,
            principal: 0,
            interest: 0.0,
            interest_rate: DEFAULT_INTEREST_RATE,
            previous_interest_rate: DEFAULT_INTEREST_RATE,
            last_interest_rate_change_ts: now,
            last_config_ts: crate::types::Timestamp::MIN,
            last_config_seqnum: 0,
            negligible_amount: DEFAULT_NEGLIGIBLE_AMOUNT,
            config_flags: 0,
            config_data: String::new(),
            debtor_info_iri: None,
            debtor_info_content_type: None,
            debtor_info_sha256: None,
            status_flags: 0,
            total_locked_amount: 0,
            pending_transfers_count: 0,
            last_transfer_id: initial_transfer_id(creation_date_days),
            last_transfer_number: 0,
            last_transfer_committed_at: crate::types::Timestamp::MIN,
            last_heartbeat_ts: now,
            last_interest_capitalization_ts: now,
            last_deletion_attempt_ts: crate::types::Timestamp::MIN,
            pending_account_update: false,
            scheduled_for_deletion: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.key.creditor_id == ROOT_CREDITOR_ID
    }

    pub fn is_deleted(&self) -> bool {
        self.status_flags & STATUS_DELETED_FLAG != 0
    }

    pub fn set_overflown(&mut self) {
        self.status_flags |= STATUS_OVERFLOWN_FLAG;
    }

    pub fn current_balance(&self, now: Timestamp) -> f64 {
        calc_current_balance(
            self.key.creditor_id,
            self.principal,
            self.interest,
            self.interest_rate,
            self.last_change_ts,
            now,
        )
    }

    /// Balance available to lock against new prepared transfers: current
    /// balance minus whatever is already locked. Root is allowed to go
    /// negative, so its expendable amount is not floored at zero.
    pub fn expendable_amount(&self, now: Timestamp) -> i64 {
        let available = self.current_balance(now).floor() as i64 - self.total_locked_amount;
        if self.is_root() {
            available
        } else {
            available.max(0)
        }
    }

    pub fn next_transfer_id(&mut self) -> i64 {
        self.last_transfer_id += 1;
        self.last_transfer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AccountKey {
        AccountKey::new(-1, 7)
    }

    #[test]
    fn new_account_has_zero_balance_and_seeded_transfer_id() {
        let a = Account::new(key(), 1_000, 20_000);
        assert_eq!(a.principal, 0);
        assert_eq!(a.last_transfer_id, 20_000 << 40);
        assert!(!a.is_root());
    }

    #[test]
    fn expendable_amount_excludes_locked() {
        let mut a = Account::new(key(), 0, 1);
        a.principal = 1000;
        a.total_locked_amount = 400;
        assert_eq!(a.expendable_amount(0), 600);
    }

    #[test]
    fn root_expendable_amount_can_go_negative() {
        let mut a = Account::new(AccountKey::new(-1, 0), 0, 1);
        a.principal = -500;
        assert_eq!(a.expendable_amount(0), -500);
    }
}
