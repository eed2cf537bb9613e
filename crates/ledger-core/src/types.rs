//! Core identifier and timestamp types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix seconds, UTC. Inbound signal payloads parse their `ts` field once,
/// at deserialization, into this type; nothing downstream re-parses text.
pub type Timestamp = i64;

/// A debtor's currency domain identifier.
pub type DebtorId = i64;

/// A party identifier within one debtor's domain. `ROOT_CREDITOR_ID` is
/// reserved (see [`crate::constants::ROOT_CREDITOR_ID`]).
pub type CreditorId = i64;

/// `(debtor_id, creditor_id)` composite key identifying one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub debtor_id: DebtorId,
    pub creditor_id: CreditorId,
}

impl AccountKey {
    pub fn new(debtor_id: DebtorId, creditor_id: CreditorId) -> Self {
        Self { debtor_id, creditor_id }
    }

    pub fn is_root(&self) -> bool {
        self.creditor_id == crate::constants::ROOT_CREDITOR_ID
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.debtor_id, self.creditor_id)
    }
}

/// The originator's correlation key, carried on every transfer-related
/// signal so the issuing coordinator can match requests to outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorTriple {
    pub coordinator_type: String,
    pub coordinator_id: i64,
    pub coordinator_request_id: i64,
}

/// Strictly increasing per-account transfer id generator. The high 24 bits
/// encode the account's creation day (days since 1970-01-01 UTC) so ids
/// stay unique even if an account is purged and later re-created.
pub fn initial_transfer_id(creation_date_days: i64) -> i64 {
    creation_date_days << 40
}
