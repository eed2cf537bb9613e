//! Outbox flusher: drains the durable per-kind signal trees and republishes
//! through the bus. This is what makes the outbox in `ledger_store::db`
//! more than a write-only log — without a flusher nothing ever leaves the
//! process. Delivery is at-least-once: a signal is removed from its tree as
//! soon as it's read, before the bus confirms publish, so a crash between
//! the two can redeliver but never silently drop (component §4.C).

use std::sync::Arc;
use std::time::Duration;

use ledger_core::LedgerError;

use crate::engine::Engine;

/// `(outbox tree name, configured burst size)` pairs, one per outbound
/// signal kind. Order doesn't matter: classes are flushed independently
/// and carry no cross-class ordering guarantee, per the concurrency model.
fn outbox_classes(engine: &Engine) -> [(&'static str, usize); 8] {
    let c = &engine.config;
    [
        ("rejected_transfer", c.flush_rejected_transfers_burst_count as usize),
        ("prepared_transfer", c.flush_prepared_transfers_burst_count as usize),
        ("finalized_transfer", c.flush_finalized_transfers_burst_count as usize),
        ("account_transfer", c.flush_account_transfers_burst_count as usize),
        ("account_update", c.flush_account_updates_burst_count as usize),
        ("account_purge", c.flush_account_purges_burst_count as usize),
        ("rejected_config", c.flush_rejected_configs_burst_count as usize),
        ("pending_balance_change", c.flush_pending_balance_changes_burst_count as usize),
    ]
}

impl Engine {
    /// Drain one burst from every outbox tree and hand each signal to the
    /// bus. Returns the total number of signals published.
    pub async fn flush_outbox_once(&self) -> Result<usize, LedgerError> {
        let mut published = 0;
        for (kind, burst) in outbox_classes(self) {
            let signals = self.store.drain_outbox(kind, burst)?;
            for signal in signals {
                self.bus.publish(signal).await?;
                published += 1;
            }
        }
        Ok(published)
    }
}

/// Spawn the outbox flusher as its own periodic task, ticking at
/// `signal_flush_interval_millis`.
pub fn spawn_flusher(engine: Arc<Engine>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(engine.config.signal_flush_interval_millis));
        loop {
            interval.tick().await;
            match engine.flush_outbox_once().await {
                Ok(n) if n > 0 => tracing::debug!(count = n, "flushed outbound signals"),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "outbox flush pass failed"),
            }
        }
    })
}
