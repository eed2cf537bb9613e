//! Sled-backed persistence. One named tree per entity, bincode-encoded
//! values, big-endian composite keys for range scans (see [`crate::keys`]).
//!
//! Named trees:
//! - `account`                 — `AccountKey` -> `Account`
//! - `transfer_request`        — `(sender AccountKey, transfer_request_id)` -> `TransferRequest`
//! - `prepared_transfer`       — `(sender AccountKey, transfer_id)` -> `PreparedTransfer`
//! - `finalization_request`    — `(sender AccountKey, transfer_id)` -> `FinalizationRequest`
//! - `pending_balance_change`  — `idx_changed_account` key -> `PendingBalanceChange`
//! - `registered_balance_change` — `(debtor_id, other_creditor_id, change_id)` -> `RegisteredBalanceChange`
//! - `outbox_*`                — one tree per outbound signal kind, keyed by an
//!   auto-incrementing sequence number, drained in insertion order
//! - `meta`                    — small standalone counters and flags

use std::path::Path;

use ledger_core::{
    Account, AccountKey, FinalizationRequest, LedgerError, OutboundSignal, PendingBalanceChange,
    PreparedTransfer, RegisteredBalanceChange, TransferRequest,
};

use crate::keys::{account_key_bytes, account_key_with_suffix, changed_account_index_bytes, encode_i64};

const OUTBOX_KINDS: &[&str] = &[
    "rejected_transfer",
    "prepared_transfer",
    "finalized_transfer",
    "account_transfer",
    "account_update",
    "account_purge",
    "rejected_config",
    "pending_balance_change",
];

pub struct AccountStore {
    _db: sled::Db,
    accounts: sled::Tree,
    transfer_requests: sled::Tree,
    prepared_transfers: sled::Tree,
    finalization_requests: sled::Tree,
    pending_balance_changes: sled::Tree,
    registered_balance_changes: sled::Tree,
    outbox: std::collections::HashMap<&'static str, sled::Tree>,
    meta: sled::Tree,
}

fn storage_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Serialization(e.to_string())
}

impl AccountStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db = sled::open(path).map_err(storage_err)?;
        let accounts = db.open_tree("account").map_err(storage_err)?;
        let transfer_requests = db.open_tree("transfer_request").map_err(storage_err)?;
        let prepared_transfers = db.open_tree("prepared_transfer").map_err(storage_err)?;
        let finalization_requests = db.open_tree("finalization_request").map_err(storage_err)?;
        let pending_balance_changes = db.open_tree("pending_balance_change").map_err(storage_err)?;
        let registered_balance_changes =
            db.open_tree("registered_balance_change").map_err(storage_err)?;
        let meta = db.open_tree("meta").map_err(storage_err)?;

        let mut outbox = std::collections::HashMap::new();
        for kind in OUTBOX_KINDS {
            let tree = db.open_tree(format!("outbox_{kind}")).map_err(storage_err)?;
            outbox.insert(*kind, tree);
        }

        Ok(Self {
            _db: db,
            accounts,
            transfer_requests,
            prepared_transfers,
            finalization_requests,
            pending_balance_changes,
            registered_balance_changes,
            outbox,
            meta,
        })
    }

    pub fn flush(&self) -> Result<(), LedgerError> {
        self._db.flush().map_err(storage_err)?;
        Ok(())
    }

    // ── Account ───────────────────────────────────────────────────────────

    pub fn get_account(&self, key: &AccountKey) -> Result<Option<Account>, LedgerError> {
        match self.accounts.get(account_key_bytes(key)).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_account(&self, account: &Account) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(account).map_err(ser_err)?;
        self.accounts
            .insert(account_key_bytes(&account.key), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_account(&self, key: &AccountKey) -> Result<(), LedgerError> {
        self.accounts.remove(account_key_bytes(key)).map_err(storage_err)?;
        Ok(())
    }

    /// Scan accounts in `(debtor_id, creditor_id)` order, `limit` rows
    /// starting strictly after `after` (used by the periodic scanner to
    /// walk the keyspace in bounded blocks).
    pub fn scan_accounts(
        &self,
        after: Option<AccountKey>,
        limit: usize,
    ) -> Result<Vec<Account>, LedgerError> {
        let start = after.map(|k| account_key_bytes(&k)).unwrap_or_default();
        let mut out = Vec::with_capacity(limit);
        for item in self.accounts.range(start..) {
            let (k, v) = item.map_err(storage_err)?;
            if Some(k.as_ref()) == after.map(|a| account_key_bytes(&a)).as_deref() {
                continue;
            }
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    pub fn count_accounts(&self) -> u64 {
        self.accounts.len() as u64
    }

    // ── TransferRequest ──────────────────────────────────────────────────

    pub fn put_transfer_request(&self, req: &TransferRequest) -> Result<(), LedgerError> {
        let key = AccountKey::new(req.debtor_id, req.sender_creditor_id);
        let bytes = bincode::serialize(req).map_err(ser_err)?;
        self.transfer_requests
            .insert(account_key_with_suffix(&key, req.transfer_request_id), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_transfer_request(
        &self,
        key: &AccountKey,
        transfer_request_id: i64,
    ) -> Result<(), LedgerError> {
        self.transfer_requests
            .remove(account_key_with_suffix(key, transfer_request_id))
            .map_err(storage_err)?;
        Ok(())
    }

    /// All queued requests for one sender account, oldest first — this is
    /// what lets the drain worker batch many requests under one lock.
    pub fn iter_transfer_requests_for_account(
        &self,
        key: &AccountKey,
    ) -> Result<Vec<TransferRequest>, LedgerError> {
        let prefix = account_key_bytes(key);
        let mut out = Vec::new();
        for item in self.transfer_requests.scan_prefix(&prefix) {
            let (_, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
        }
        Ok(out)
    }

    pub fn next_transfer_request_id(&self, key: &AccountKey) -> Result<i64, LedgerError> {
        self.next_sequence(&format!("transfer_request_id/{key}"))
    }

    /// Next `change_id` for a balance change destined at `key`, scoped by
    /// the originating account so two senders committing to the same
    /// recipient in the same tick never collide.
    pub fn next_change_id(&self, key: &AccountKey) -> Result<i64, LedgerError> {
        self.next_sequence(&format!("change_id/{key}"))
    }

    // ── PreparedTransfer ─────────────────────────────────────────────────

    pub fn put_prepared_transfer(&self, t: &PreparedTransfer) -> Result<(), LedgerError> {
        let key = AccountKey::new(t.debtor_id, t.sender_creditor_id);
        let bytes = bincode::serialize(t).map_err(ser_err)?;
        self.prepared_transfers
            .insert(account_key_with_suffix(&key, t.transfer_id), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn get_prepared_transfer(
        &self,
        key: &AccountKey,
        transfer_id: i64,
    ) -> Result<Option<PreparedTransfer>, LedgerError> {
        match self
            .prepared_transfers
            .get(account_key_with_suffix(key, transfer_id))
            .map_err(storage_err)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn delete_prepared_transfer(
        &self,
        key: &AccountKey,
        transfer_id: i64,
    ) -> Result<(), LedgerError> {
        self.prepared_transfers
            .remove(account_key_with_suffix(key, transfer_id))
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_all_prepared_transfers(&self, limit: usize) -> Result<Vec<PreparedTransfer>, LedgerError> {
        let mut out = Vec::with_capacity(limit);
        for item in self.prepared_transfers.iter() {
            let (_, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    // ── FinalizationRequest ──────────────────────────────────────────────

    pub fn put_finalization_request(&self, r: &FinalizationRequest) -> Result<(), LedgerError> {
        let key = AccountKey::new(r.debtor_id, r.sender_creditor_id);
        let bytes = bincode::serialize(r).map_err(ser_err)?;
        self.finalization_requests
            .insert(account_key_with_suffix(&key, r.transfer_id), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_finalization_request(
        &self,
        key: &AccountKey,
        transfer_id: i64,
    ) -> Result<(), LedgerError> {
        self.finalization_requests
            .remove(account_key_with_suffix(key, transfer_id))
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn iter_finalization_requests_for_account(
        &self,
        key: &AccountKey,
    ) -> Result<Vec<FinalizationRequest>, LedgerError> {
        let prefix = account_key_bytes(key);
        let mut out = Vec::new();
        for item in self.finalization_requests.scan_prefix(&prefix) {
            let (_, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
        }
        Ok(out)
    }

    // ── Balance-change inbox ─────────────────────────────────────────────

    pub fn get_registered_balance_change(
        &self,
        debtor_id: i64,
        other_creditor_id: i64,
        change_id: i64,
    ) -> Result<Option<RegisteredBalanceChange>, LedgerError> {
        let k = changed_account_index_bytes(debtor_id, other_creditor_id, change_id);
        match self.registered_balance_changes.get(k).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    pub fn put_registered_balance_change(
        &self,
        r: &RegisteredBalanceChange,
    ) -> Result<(), LedgerError> {
        let k = changed_account_index_bytes(r.debtor_id, r.other_creditor_id, r.change_id);
        let bytes = bincode::serialize(r).map_err(ser_err)?;
        self.registered_balance_changes.insert(k, bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn put_pending_balance_change(
        &self,
        p: &PendingBalanceChange,
    ) -> Result<(), LedgerError> {
        let k = changed_account_index_bytes(p.debtor_id, p.creditor_id, p.change_id);
        let bytes = bincode::serialize(p).map_err(ser_err)?;
        self.pending_balance_changes.insert(k, bytes).map_err(storage_err)?;
        Ok(())
    }

    pub fn delete_pending_balance_change(
        &self,
        debtor_id: i64,
        creditor_id: i64,
        change_id: i64,
    ) -> Result<(), LedgerError> {
        let k = changed_account_index_bytes(debtor_id, creditor_id, change_id);
        self.pending_balance_changes.remove(k).map_err(storage_err)?;
        Ok(())
    }

    /// All pending deltas for one account (`idx_changed_account`), in
    /// `change_id` order, which matches `committed_at` order for
    /// same-sender delivery.
    pub fn iter_pending_balance_changes_for_account(
        &self,
        debtor_id: i64,
        creditor_id: i64,
    ) -> Result<Vec<PendingBalanceChange>, LedgerError> {
        let mut prefix = Vec::with_capacity(16);
        prefix.extend_from_slice(&encode_i64(debtor_id));
        prefix.extend_from_slice(&encode_i64(creditor_id));
        let mut out = Vec::new();
        for item in self.pending_balance_changes.scan_prefix(&prefix) {
            let (_, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
        }
        Ok(out)
    }

    // ── Outbox ────────────────────────────────────────────────────────────

    fn outbox_kind(signal: &OutboundSignal) -> &'static str {
        match signal {
            OutboundSignal::RejectedTransfer { .. } => "rejected_transfer",
            OutboundSignal::PreparedTransfer { .. } => "prepared_transfer",
            OutboundSignal::FinalizedTransfer { .. } => "finalized_transfer",
            OutboundSignal::AccountTransfer { .. } => "account_transfer",
            OutboundSignal::AccountUpdate { .. } => "account_update",
            OutboundSignal::AccountPurge { .. } => "account_purge",
            OutboundSignal::RejectedConfig { .. } => "rejected_config",
            OutboundSignal::PendingBalanceChange { .. } => "pending_balance_change",
        }
    }

    /// Stage an outbound signal in the same call path as the state mutation
    /// that produced it. Callers are expected to have already committed the
    /// mutation to the relevant tree(s) before calling this.
    pub fn stage_outbound_signal(&self, signal: &OutboundSignal) -> Result<(), LedgerError> {
        let kind = Self::outbox_kind(signal);
        let tree = self.outbox.get(kind).expect("outbox tree exists for every signal kind");
        let seq = self.next_sequence(&format!("outbox_seq/{kind}"))?;
        let bytes = bincode::serialize(signal).map_err(ser_err)?;
        tree.insert(encode_i64(seq), bytes).map_err(storage_err)?;
        Ok(())
    }

    /// Drain up to `burst` oldest signals of one kind, removing them as
    /// they're returned (callers publish, then treat the return as
    /// already-dequeued — redelivery on crash is acceptable, consumers
    /// dedup by natural key).
    pub fn drain_outbox(&self, kind: &str, burst: usize) -> Result<Vec<OutboundSignal>, LedgerError> {
        let tree = self
            .outbox
            .get(kind)
            .ok_or_else(|| LedgerError::Other(format!("unknown outbox kind {kind}")))?;
        let mut out = Vec::with_capacity(burst);
        let mut keys_to_remove = Vec::with_capacity(burst);
        for item in tree.iter() {
            let (k, v) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&v).map_err(ser_err)?);
            keys_to_remove.push(k);
            if out.len() >= burst {
                break;
            }
        }
        for k in keys_to_remove {
            tree.remove(k).map_err(storage_err)?;
        }
        Ok(out)
    }

    // ── Meta / sequence counters ─────────────────────────────────────────

    fn next_sequence(&self, name: &str) -> Result<i64, LedgerError> {
        let current = match self.meta.get(name.as_bytes()).map_err(storage_err)? {
            Some(bytes) => i64::from_be_bytes(bytes.as_ref().try_into().map_err(|_| {
                LedgerError::Storage(format!("corrupt sequence counter {name}"))
            })?),
            None => 0,
        };
        let next = current + 1;
        self.meta
            .insert(name.as_bytes(), &next.to_be_bytes())
            .map_err(storage_err)?;
        Ok(next)
    }
}
