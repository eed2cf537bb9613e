//! Process entry point: parse CLI args, load configuration, open the
//! store, wire the engine's collaborators, spawn the queue-drain loop,
//! the periodic scanners, and the HTTP introspection server.

use std::sync::Arc;

use clap::Parser;
use ledger_bus::{HttpPeerFetcher, InMemorySignalBus, LoggingSignalBus};
use ledger_core::{Configuration, InboundSignal};
use ledger_engine::{spawn_flusher, spawn_scanners, Engine};
use ledger_http::{HttpServer, HttpServerState};
use ledger_store::{AccountLocks, AccountStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ledger-node", version, about = "Distributed currency-ledger accounting core")]
struct Args {
    /// Directory for the embedded sled database.
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Address the read-only HTTP introspection server binds to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    http_listen_addr: String,

    /// Base URL of the peer fetch API used for recipient reachability and
    /// root-config lookups. If unset, all recipients are treated as
    /// unreachable (the conservative default for a standalone instance).
    #[arg(long)]
    fetch_api_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,ledger=debug".parse().unwrap()))
        .init();

    let args = Args::parse();
    let mut config = Configuration::from_env();
    config.data_dir = args.data_dir.clone();
    config.http_listen_addr = args.http_listen_addr.clone();
    if args.fetch_api_url.is_some() {
        config.fetch_api_url = args.fetch_api_url.clone();
    }
    config.check_sanity()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(AccountStore::open(&config.data_dir)?);
    let locks = Arc::new(AccountLocks::new());

    let (outbound_bus, mut outbound_rx) = InMemorySignalBus::new(4096);
    let bus = Arc::new(LoggingSignalBus::new(outbound_bus));
    tokio::spawn(async move {
        // A real deployment hands this receiver to a broker producer;
        // here we just drain it so the channel never backs up.
        while outbound_rx.recv().await.is_some() {}
    });

    let fetcher = Arc::new(HttpPeerFetcher::new(
        config.fetch_api_url.clone().unwrap_or_default(),
        config.fetch_api_timeout_seconds,
        config.fetch_connections as usize,
        config.fetch_data_cache_size,
    ));

    let engine = Arc::new(Engine::new(store.clone(), locks, bus, fetcher, config.clone()));

    let (accounts_scanner, transfers_scanner) = spawn_scanners(engine.clone());
    let flusher = spawn_flusher(engine.clone());

    let http_state = Arc::new(HttpServerState { store: store.clone() });
    let http_addr: std::net::SocketAddr = config.http_listen_addr.parse()?;
    let http_engine = engine.clone();
    let http_handle = tokio::spawn(async move {
        let _ = http_engine; // keep the engine alive for the process lifetime
        if let Err(e) = HttpServer::new(http_state).serve(http_addr).await {
            tracing::error!(error = %e, "HTTP introspection server exited");
        }
    });

    let (inbound_tx, mut inbound_rx) = tokio::sync::mpsc::channel::<InboundSignal>(4096);
    let dispatch_engine = engine.clone();
    let dispatch_handle = tokio::spawn(async move {
        while let Some(signal) = inbound_rx.recv().await {
            let now = chrono::Utc::now().timestamp();
            if let Err(e) = dispatch_inbound(&dispatch_engine, signal, now).await {
                tracing::warn!(error = %e, "failed to process inbound signal");
            }
        }
    });

    drop(inbound_tx); // no external bus wired in this standalone binary yet

    tracing::info!(data_dir = %config.data_dir, http_addr = %http_addr, "ledger-node started");

    let _ = tokio::join!(accounts_scanner, transfers_scanner, flusher, http_handle, dispatch_handle);
    Ok(())
}

async fn dispatch_inbound(
    engine: &Engine,
    signal: InboundSignal,
    now: i64,
) -> Result<(), ledger_core::LedgerError> {
    use ledger_core::AccountKey;

    match signal {
        InboundSignal::ConfigureAccount {
            debtor_id,
            creditor_id,
            ts,
            seqnum,
            negligible_amount,
            config_flags,
            config_data,
        } => {
            let key = AccountKey::new(debtor_id, creditor_id);
            engine
                .configure_account(key, ts, seqnum, negligible_amount, config_flags, config_data, now)
                .await
        }
        InboundSignal::PrepareTransfer {
            coordinator,
            debtor_id,
            creditor_id,
            min_locked_amount,
            max_locked_amount,
            recipient_identifier,
            min_interest_rate,
            max_commit_delay,
            ts,
        } => {
            let key = AccountKey::new(debtor_id, creditor_id);
            let transfer_request_id = engine.store.next_transfer_request_id(&key)?;
            engine
                .enqueue_transfer_request(ledger_core::TransferRequest {
                    debtor_id,
                    sender_creditor_id: creditor_id,
                    transfer_request_id,
                    coordinator,
                    min_locked_amount,
                    max_locked_amount,
                    recipient_creditor_id: recipient_identifier.parse().ok(),
                    deadline: ts + max_commit_delay,
                    min_interest_rate,
                    ts,
                })
                .await?;
            engine.process_transfer_requests(key, now).await
        }
        InboundSignal::FinalizeTransfer {
            debtor_id,
            creditor_id,
            transfer_id,
            coordinator,
            committed_amount,
            transfer_note_format,
            transfer_note,
            ts,
        } => {
            let key = AccountKey::new(debtor_id, creditor_id);
            engine
                .enqueue_finalization_request(ledger_core::FinalizationRequest {
                    debtor_id,
                    sender_creditor_id: creditor_id,
                    transfer_id,
                    coordinator,
                    committed_amount,
                    transfer_note_format,
                    transfer_note,
                    ts,
                })
                .await?;
            engine.process_finalization_requests(key, now).await
        }
        InboundSignal::PendingBalanceChange {
            debtor_id,
            creditor_id,
            other_creditor_id,
            change_id,
            coordinator_type,
            transfer_note_format,
            transfer_note,
            committed_at,
            principal_delta,
        } => {
            engine
                .on_pending_balance_change(
                    debtor_id,
                    creditor_id,
                    other_creditor_id,
                    change_id,
                    coordinator_type,
                    transfer_note_format,
                    transfer_note,
                    committed_at,
                    principal_delta,
                )
                .await?;
            engine.process_pending_balance_changes(debtor_id, creditor_id, now).await
        }
    }
}
