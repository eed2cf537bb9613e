//! The six end-to-end scenarios the accounting core must satisfy:
//! reject-when-underfunded, invalid recipient, the happy path, lazy
//! rate-change propagation, idempotent balance-change delivery, and
//! dismissal by a zero-amount finalize.

use std::sync::Arc;

use async_trait::async_trait;
use ledger_bus::{OutboundSignal, PeerFetcher, InMemorySignalBus, RootConfig};
use ledger_core::{AccountKey, Configuration, CoordinatorTriple, FinalizationRequest, TransferRequest};
use ledger_engine::Engine;
use ledger_store::{AccountLocks, AccountStore};
use tokio::sync::mpsc::Receiver;

fn coordinator(id: i64, request_id: i64) -> CoordinatorTriple {
    CoordinatorTriple {
        coordinator_type: "test".to_string(),
        coordinator_id: id,
        coordinator_request_id: request_id,
    }
}

/// A fixed-answer fetcher for tests that don't want real HTTP peer calls.
struct FakeFetcher {
    reachable: bool,
    root_config: Option<RootConfig>,
}

#[async_trait]
impl PeerFetcher for FakeFetcher {
    async fn is_reachable(&self, _debtor_id: i64, _creditor_id: i64) -> bool {
        self.reachable
    }

    async fn get_root_config(&self, _debtor_id: i64) -> Option<RootConfig> {
        self.root_config.clone()
    }
}

fn test_engine_with_reachability(reachable: bool) -> (Engine, Receiver<OutboundSignal>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AccountStore::open(dir.path()).unwrap());
    let locks = Arc::new(AccountLocks::new());
    let (bus, rx) = InMemorySignalBus::new(64);
    let fetcher = Arc::new(FakeFetcher { reachable, root_config: None });
    (Engine::new(store, locks, Arc::new(bus), fetcher, Configuration::default()), rx)
}

fn test_engine_with_root_config(root_config: RootConfig) -> (Engine, Receiver<OutboundSignal>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(AccountStore::open(dir.path()).unwrap());
    let locks = Arc::new(AccountLocks::new());
    let (bus, rx) = InMemorySignalBus::new(64);
    let fetcher = Arc::new(FakeFetcher { reachable: true, root_config: Some(root_config) });
    (Engine::new(store, locks, Arc::new(bus), fetcher, Configuration::default()), rx)
}

fn test_engine() -> (Engine, Receiver<OutboundSignal>) {
    test_engine_with_reachability(true)
}

async fn drain(engine: &Engine, rx: &mut Receiver<OutboundSignal>) -> Vec<OutboundSignal> {
    engine.flush_outbox_once().await.unwrap();
    let mut out = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        out.push(signal);
    }
    out
}

#[tokio::test]
async fn reject_when_underfunded() {
    let (engine, mut rx) = test_engine_with_reachability(true);
    let sender = AccountKey::new(-1, 1);
    engine
        .configure_account(sender, 0, 1, 0.0, 0, String::new(), 0)
        .await
        .unwrap();

    engine
        .enqueue_transfer_request(TransferRequest {
            debtor_id: -1,
            sender_creditor_id: 1,
            transfer_request_id: 1,
            coordinator: coordinator(1, 2),
            min_locked_amount: 1,
            max_locked_amount: 200,
            recipient_creditor_id: Some(2),
            deadline: 1_000_000,
            min_interest_rate: -100.0,
            ts: 0,
        })
        .await
        .unwrap();

    engine.process_transfer_requests(sender, 0).await.unwrap();

    let signals = drain(&engine, &mut rx).await;
    assert_eq!(signals.len(), 1);
    match &signals[0] {
        OutboundSignal::RejectedTransfer { status_code, .. } => {
            assert_eq!(status_code, ledger_core::constants::SC_INSUFFICIENT_AVAILABLE_AMOUNT);
        }
        other => panic!("unexpected signal: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_recipient_is_rejected() {
    let (engine, mut rx) = test_engine_with_reachability(true);
    let sender = AccountKey::new(-1, 1);
    engine
        .configure_account(sender, 0, 1, 0.0, 0, String::new(), 0)
        .await
        .unwrap();

    engine
        .enqueue_transfer_request(TransferRequest {
            debtor_id: -1,
            sender_creditor_id: 1,
            transfer_request_id: 1,
            coordinator: coordinator(1, 2),
            min_locked_amount: 0,
            max_locked_amount: 100,
            recipient_creditor_id: None, // "invalid" never parsed
            deadline: 1_000_000,
            min_interest_rate: -100.0,
            ts: 0,
        })
        .await
        .unwrap();

    engine.process_transfer_requests(sender, 0).await.unwrap();

    let signals = drain(&engine, &mut rx).await;
    assert_eq!(signals.len(), 1);
    match &signals[0] {
        OutboundSignal::RejectedTransfer { status_code, .. } => {
            assert_eq!(status_code, ledger_core::constants::SC_RECIPIENT_IS_UNREACHABLE);
        }
        other => panic!("unexpected signal: {other:?}"),
    }
}

#[tokio::test]
async fn dismissal_by_zero_restores_lock_accounting() {
    let (engine, mut rx) = test_engine();
    let root = AccountKey::new(-1, ledger_core::constants::ROOT_CREDITOR_ID);
    engine
        .configure_account(root, 0, 1, 0.0, 0, String::new(), 0)
        .await
        .unwrap();
    {
        let mut account = engine.store.get_account(&root).unwrap().unwrap();
        account.principal = 1000;
        engine.store.put_account(&account).unwrap();
    }

    let sender = root;
    engine
        .enqueue_transfer_request(TransferRequest {
            debtor_id: -1,
            sender_creditor_id: sender.creditor_id,
            transfer_request_id: 1,
            coordinator: coordinator(1, 1),
            min_locked_amount: 10,
            max_locked_amount: 50,
            recipient_creditor_id: Some(999),
            deadline: 1_000_000,
            min_interest_rate: -100.0,
            ts: 0,
        })
        .await
        .unwrap();

    // This test only exercises the dismissal path, so seed the
    // PreparedTransfer directly rather than draining the above request.
    drain(&engine, &mut rx).await;
    let mut account = engine.store.get_account(&sender).unwrap().unwrap();
    let transfer_id = account.next_transfer_id();
    let prepared = ledger_core::PreparedTransfer {
        debtor_id: -1,
        sender_creditor_id: sender.creditor_id,
        transfer_id,
        coordinator: coordinator(1, 1),
        recipient_creditor_id: 2,
        prepared_at: 0,
        min_interest_rate: -100.0,
        demurrage_rate: -1.0,
        deadline: 1_000_000,
        locked_amount: 50,
        last_reminder_ts: None,
    };
    account.total_locked_amount += 50;
    account.pending_transfers_count += 1;
    engine.store.put_account(&account).unwrap();
    engine.store.put_prepared_transfer(&prepared).unwrap();
    // drop the stray queued transfer request from above so it doesn't
    // interfere with the finalize-only assertions that follow.
    engine.store.delete_transfer_request(&sender, 1).unwrap();

    engine
        .enqueue_finalization_request(FinalizationRequest {
            debtor_id: -1,
            sender_creditor_id: sender.creditor_id,
            transfer_id,
            coordinator: coordinator(1, 1),
            committed_amount: 0,
            transfer_note_format: String::new(),
            transfer_note: String::new(),
            ts: 0,
        })
        .await
        .unwrap();
    engine.process_finalization_requests(sender, 0).await.unwrap();

    let account = engine.store.get_account(&sender).unwrap().unwrap();
    assert_eq!(account.total_locked_amount, 0);
    assert_eq!(account.pending_transfers_count, 0);
    assert!(engine.store.get_prepared_transfer(&sender, transfer_id).unwrap().is_none());

    let signals = drain(&engine, &mut rx).await;
    assert!(signals.iter().any(|s| matches!(
        s,
        OutboundSignal::FinalizedTransfer { committed_amount: 0, status_code, .. }
            if status_code == ledger_core::constants::SC_OK
    )));
    assert!(
        !signals.iter().any(|s| matches!(s, OutboundSignal::PendingBalanceChange { .. })),
        "dismissal must not emit a balance-change signal"
    );
}

#[tokio::test]
async fn idempotent_balance_change_applies_once() {
    let (engine, mut rx) = test_engine();
    let target = AccountKey::new(-1, 1);
    engine
        .configure_account(target, 0, 1, 0.0, 0, String::new(), 0)
        .await
        .unwrap();

    for _ in 0..2 {
        engine
            .on_pending_balance_change(-1, 1, 123, 1, "direct".to_string(), String::new(), String::new(), 0, 1000)
            .await
            .unwrap();
    }
    engine.process_pending_balance_changes(-1, 1, 0).await.unwrap();
    // Redeliver after the first apply: the registered row is now
    // `is_applied`, so a second drain is a no-op even though nothing new
    // is pending (the dedup happened at ingestion).
    engine.process_pending_balance_changes(-1, 1, 0).await.unwrap();

    let account = engine.store.get_account(&target).unwrap().unwrap();
    assert_eq!(account.principal, 1000);

    let registered = engine.store.get_registered_balance_change(-1, 123, 1).unwrap().unwrap();
    assert!(registered.is_applied);

    let signals = drain(&engine, &mut rx).await;
    let transfer_signals: Vec<_> = signals
        .iter()
        .filter(|s| matches!(s, OutboundSignal::AccountTransfer { .. }))
        .collect();
    assert_eq!(transfer_signals.len(), 1);
}

#[tokio::test]
async fn rate_change_capitalizes_then_moves_rate() {
    let (engine, _rx) = test_engine();
    let account_key = AccountKey::new(-1, 1);
    engine
        .configure_account(account_key, 0, 1, 0.0, 0, String::new(), 0)
        .await
        .unwrap();

    let mut account = engine.store.get_account(&account_key).unwrap().unwrap();
    ledger_engine::Engine::apply_interest_rate_change(&mut account, 3.567, 1_000_000);
    engine.store.put_account(&account).unwrap();

    let account = engine.store.get_account(&account_key).unwrap().unwrap();
    assert_eq!(account.interest_rate, 3.567);
    assert_eq!(account.last_interest_rate_change_ts, 1_000_000);
}

/// The lazy-propagation path the spec actually requires: a non-root
/// account's rate only moves when the periodic scanner touches it and
/// re-reads the (possibly newly-changed) root config through the Fetch
/// collaborator — not by applying the change directly.
#[tokio::test]
async fn rate_change_propagates_lazily_on_next_touch() {
    let (engine, _rx) = test_engine_with_root_config(RootConfig { interest_rate: 3.567 });
    let account_key = AccountKey::new(-1, 1);
    engine
        .configure_account(account_key, 0, 1, 0.0, 0, String::new(), 0)
        .await
        .unwrap();

    let before = engine.store.get_account(&account_key).unwrap().unwrap();
    assert_eq!(before.interest_rate, 0.0);

    engine.scan_accounts_once(1_000_000).await.unwrap();

    let after = engine.store.get_account(&account_key).unwrap().unwrap();
    assert_eq!(after.interest_rate, 3.567);
    assert_eq!(after.previous_interest_rate, 0.0);
}

#[tokio::test]
async fn happy_path_transfer_settles_on_both_sides() {
    let (engine, mut rx) = test_engine_with_reachability(true);
    let sender = AccountKey::new(-1, 1);
    let recipient = AccountKey::new(-1, 2);
    engine.configure_account(sender, 0, 1, 0.0, 0, String::new(), 0).await.unwrap();
    engine.configure_account(recipient, 0, 1, 0.0, 0, String::new(), 0).await.unwrap();
    {
        let mut account = engine.store.get_account(&sender).unwrap().unwrap();
        account.principal = 1000;
        engine.store.put_account(&account).unwrap();
    }

    engine
        .enqueue_transfer_request(TransferRequest {
            debtor_id: -1,
            sender_creditor_id: 1,
            transfer_request_id: 1,
            coordinator: coordinator(1, 2),
            min_locked_amount: 10,
            max_locked_amount: 100,
            recipient_creditor_id: Some(2),
            deadline: 1_000_000,
            min_interest_rate: -100.0,
            ts: 0,
        })
        .await
        .unwrap();
    engine.process_transfer_requests(sender, 0).await.unwrap();

    let prepared_signals = drain(&engine, &mut rx).await;
    let transfer_id = match &prepared_signals[0] {
        OutboundSignal::PreparedTransfer { transfer_id, locked_amount, .. } => {
            assert_eq!(*locked_amount, 100);
            *transfer_id
        }
        other => panic!("expected PreparedTransfer, got {other:?}"),
    };

    engine
        .enqueue_finalization_request(FinalizationRequest {
            debtor_id: -1,
            sender_creditor_id: 1,
            transfer_id,
            coordinator: coordinator(1, 2),
            committed_amount: 100,
            transfer_note_format: String::new(),
            transfer_note: String::new(),
            ts: 0,
        })
        .await
        .unwrap();
    engine.process_finalization_requests(sender, 0).await.unwrap();

    let sender_account = engine.store.get_account(&sender).unwrap().unwrap();
    assert_eq!(sender_account.principal, 900);
    assert_eq!(sender_account.total_locked_amount, 0);

    engine.process_pending_balance_changes(-1, 2, 0).await.unwrap();
    let recipient_account = engine.store.get_account(&recipient).unwrap().unwrap();
    assert_eq!(recipient_account.principal, 100);
}
