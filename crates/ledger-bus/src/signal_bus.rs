//! Abstract outbound delivery. A real deployment backs this with a message
//! broker producer; this crate ships the two collaborators that matter for
//! running and testing the core: an in-memory channel bus and a logging
//! decorator.

use async_trait::async_trait;
use ledger_core::{LedgerError, OutboundSignal};
use tokio::sync::mpsc;

#[async_trait]
pub trait SignalBus: Send + Sync {
    async fn publish(&self, signal: OutboundSignal) -> Result<(), LedgerError>;
}

/// Backed by a bounded mpsc channel. Used by the node binary's own
/// loopback wiring and by tests that want to assert on emitted signals.
pub struct InMemorySignalBus {
    sender: mpsc::Sender<OutboundSignal>,
}

impl InMemorySignalBus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundSignal>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl SignalBus for InMemorySignalBus {
    async fn publish(&self, signal: OutboundSignal) -> Result<(), LedgerError> {
        self.sender
            .send(signal)
            .await
            .map_err(|e| LedgerError::Bus(e.to_string()))
    }
}

/// Decorates another bus, logging every publish at debug level before
/// delegating. Useful for observability without touching the inner bus.
pub struct LoggingSignalBus<B> {
    inner: B,
}

impl<B: SignalBus> LoggingSignalBus<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: SignalBus> SignalBus for LoggingSignalBus<B> {
    async fn publish(&self, signal: OutboundSignal) -> Result<(), LedgerError> {
        tracing::debug!(?signal, "publishing outbound signal");
        self.inner.publish(signal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_bus_delivers_published_signal() {
        let (bus, mut rx) = InMemorySignalBus::new(8);
        bus.publish(OutboundSignal::AccountPurge {
            debtor_id: 1,
            creditor_id: 2,
            ts: 0,
        })
        .await
        .unwrap();
        let received = rx.recv().await.unwrap();
        matches!(received, OutboundSignal::AccountPurge { .. });
    }
}
