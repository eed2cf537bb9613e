use thiserror::Error;

/// Typed error for every failure mode a ledger component can hit internally.
/// Never serialized to peers — business-level failures are reported as
/// typed outbound signals instead (see `ledger_core::signal`).
#[derive(Error, Debug)]
pub enum LedgerError {
    // ── Storage errors ───────────────────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // ── Validation errors ────────────────────────────────────────────────
    #[error("invalid account key {0}")]
    InvalidAccountKey(String),

    #[error("invalid transfer request: {0}")]
    InvalidTransferRequest(String),

    #[error("invalid configure request: {0}")]
    InvalidConfigureRequest(String),

    #[error("config_data exceeds {max} bytes")]
    ConfigDataTooLarge { max: usize },

    #[error("debtor_info_iri exceeds {max} characters")]
    IriTooLong { max: usize },

    // ── Concurrency ───────────────────────────────────────────────────────
    #[error("concurrent modification detected for account {0}, retry")]
    ConcurrencyConflict(String),

    // ── Configuration sanity (fatal at startup) ──────────────────────────
    #[error("configuration error: {0}")]
    Configuration(String),

    // ── Collaborator errors ───────────────────────────────────────────────
    #[error("bus publish failed: {0}")]
    Bus(String),

    #[error("peer fetch failed: {0}")]
    Fetch(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}
