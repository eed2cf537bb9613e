pub mod account;
pub mod config;
pub mod constants;
pub mod error;
pub mod money;
pub mod signal;
pub mod transfer;
pub mod types;

pub use account::Account;
pub use config::Configuration;
pub use error::LedgerError;
pub use signal::{InboundSignal, OutboundSignal};
pub use transfer::{
    FinalizationRequest, PendingBalanceChange, PreparedTransfer, RegisteredBalanceChange,
    TransferRequest,
};
pub use types::{AccountKey, CoordinatorTriple, CreditorId, DebtorId, Timestamp};
