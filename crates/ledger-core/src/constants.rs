//! ─── Ledger accounting constants ───────────────────────────────────────────
//!
//! Amounts are signed 64-bit integers. `MIN_INT64` is reserved as a sentinel
//! and must never be the stored value of a principal.

// ── Reserved identifiers ─────────────────────────────────────────────────────

/// The creditor id that designates a debtor's own account: source and sink
/// of all money and interest for that debtor. Never accrues interest.
pub const ROOT_CREDITOR_ID: i64 = 0;

// ── Integer bounds ───────────────────────────────────────────────────────────

pub const MIN_INT64: i64 = i64::MIN;
pub const MAX_INT64: i64 = i64::MAX;

/// Principals are kept strictly greater than this floor so `MIN_INT64` itself
/// never appears as a stored value (it would make negation and saturation
/// arithmetic ambiguous at the boundary).
pub const MIN_PRINCIPAL: i64 = -MAX_INT64;

// ── Interest math ─────────────────────────────────────────────────────────────

pub const SECONDS_IN_DAY: f64 = 86_400.0;
pub const SECONDS_IN_YEAR: f64 = 365.25 * SECONDS_IN_DAY;

/// An account whose current balance is at or below this value is always
/// considered negligible, regardless of its configured `negligible_amount`.
pub const MIN_NEGLIGIBLE_BALANCE: f64 = 2.0;

// ── Field size limits ─────────────────────────────────────────────────────────

pub const CONFIG_DATA_MAX_BYTES: usize = 2000;
pub const IRI_MAX_LENGTH: usize = 200;
pub const CONTENT_TYPE_MAX_BYTES: usize = 100;
pub const DEBTOR_INFO_SHA256_BYTES: usize = 32;

// ── Status flags (bitmask, Account.status_flags) ─────────────────────────────

pub const STATUS_DELETED_FLAG: i32 = 1 << 0;
pub const STATUS_OVERFLOWN_FLAG: i32 = 1 << 1;

// ── Config flags (bitmask, Account.config_flags, set by configure signals) ──

/// Set by the owner to request deletion once the account is empty and idle.
pub const CONFIG_SCHEDULED_FOR_DELETION_FLAG: i32 = 1 << 0;

/// Every bit a configure signal is allowed to set; anything else is rejected.
pub const CONFIG_FLAGS_MASK: i32 = CONFIG_SCHEDULED_FOR_DELETION_FLAG;

// ── Coordinator types (open set; these are the well-known ones) ─────────────

pub const COORDINATOR_TYPE_DIRECT: &str = "direct";
pub const COORDINATOR_TYPE_INTEREST: &str = "interest";
pub const COORDINATOR_TYPE_DELETE: &str = "delete";

// ── Transfer status codes ────────────────────────────────────────────────────

pub const SC_OK: &str = "OK";
pub const SC_TIMEOUT: &str = "TIMEOUT";
pub const SC_TOO_LOW_INTEREST_RATE: &str = "TOO_LOW_INTEREST_RATE";
pub const SC_SENDER_IS_UNREACHABLE: &str = "SENDER_IS_UNREACHABLE";
pub const SC_RECIPIENT_IS_UNREACHABLE: &str = "RECIPIENT_IS_UNREACHABLE";
pub const SC_INSUFFICIENT_AVAILABLE_AMOUNT: &str = "INSUFFICIENT_AVAILABLE_AMOUNT";
pub const SC_RECIPIENT_SAME_AS_SENDER: &str = "RECIPIENT_SAME_AS_SENDER";
pub const SC_TOO_MANY_TRANSFERS: &str = "TOO_MANY_TRANSFERS";

// ── Default account config ───────────────────────────────────────────────────

pub const DEFAULT_NEGLIGIBLE_AMOUNT: f64 = 0.0;
pub const DEFAULT_INTEREST_RATE: f64 = 0.0;
pub const INTEREST_RATE_FLOOR: f64 = -100.0;
pub const INTEREST_RATE_CEIL: f64 = 100.0;
