//! Monetary primitives: saturating principal arithmetic and the continuous-
//! compounding interest model. Formulas mirror the reference ledger's
//! `calc_k` / `calc_current_balance` / `calc_due_interest` exactly, including
//! the float-precision rules that the reference implementation depends on.

use crate::constants::{MAX_INT64, MIN_PRINCIPAL, ROOT_CREDITOR_ID, SECONDS_IN_YEAR};
use crate::types::{CreditorId, Timestamp};

/// Clamp a 64-bit arithmetic result into the valid principal range,
/// saturating rather than wrapping. `MIN_INT64` itself is never returned;
/// anything at or below it saturates to `-MAX_INT64`.
pub fn contain_principal_overflow(value: i128) -> (i64, bool) {
    if value <= MIN_PRINCIPAL as i128 {
        (MIN_PRINCIPAL, true)
    } else if value > MAX_INT64 as i128 {
        (MAX_INT64, true)
    } else {
        (value as i64, false)
    }
}

/// Saturating add of a principal delta, reporting whether the result
/// overflowed (the caller sets `STATUS_OVERFLOWN_FLAG` when it does).
pub fn saturating_add_principal(principal: i64, delta: i64) -> (i64, bool) {
    contain_principal_overflow(principal as i128 + delta as i128)
}

/// Continuous-compounding rate constant: `ln(1 + rate/100) / seconds_per_year`.
pub fn calc_k(interest_rate_percent: f64) -> f64 {
    (1.0 + interest_rate_percent / 100.0).ln() / SECONDS_IN_YEAR
}

/// Current balance including interest accrued since `last_change_ts`, given
/// in arbitrary-precision-friendly `f64` to mirror the reference formula.
/// The root account never accrues interest: it is the issuer, not a holder.
pub fn calc_current_balance(
    creditor_id: CreditorId,
    principal: i64,
    interest: f64,
    interest_rate: f64,
    last_change_ts: Timestamp,
    current_ts: Timestamp,
) -> f64 {
    let mut balance = principal as f64;
    if creditor_id != ROOT_CREDITOR_ID {
        balance += interest;
        if balance > 0.0 {
            let passed_seconds = (current_ts - last_change_ts).max(0) as f64;
            balance *= (calc_k(interest_rate) * passed_seconds).exp();
        }
    }
    balance
}

/// Interest accrued on `amount` from `due_ts` to `current_ts`, correctly
/// splitting the interval across a single interest-rate change at
/// `rate_change_ts`. Sign-symmetric in `amount`.
pub fn calc_due_interest(
    amount: f64,
    due_ts: Timestamp,
    current_ts: Timestamp,
    previous_interest_rate: f64,
    interest_rate: f64,
    rate_change_ts: Timestamp,
) -> f64 {
    let start_ts = due_ts;
    let end_ts = current_ts.max(due_ts);
    let interest_rate_change_ts = rate_change_ts.min(end_ts);

    let t = (end_ts - start_ts) as f64;
    let t1 = ((interest_rate_change_ts - start_ts) as f64).max(0.0);
    let t2 = ((end_ts - interest_rate_change_ts) as f64).min(t).max(0.0);

    debug_assert!(t >= 0.0);
    debug_assert!((0.0..=t).contains(&t1));
    debug_assert!((0.0..=t).contains(&t2));

    let k1 = calc_k(previous_interest_rate);
    let k2 = calc_k(interest_rate);
    amount * ((k1 * t1 + k2 * t2).exp() - 1.0)
}

/// A balance is negligible if it's at or below the account's configured
/// negligible amount, or at or below the hard 2.0 floor.
pub fn is_negligible_balance(balance: f64, negligible_amount: f64) -> bool {
    balance <= negligible_amount || balance <= crate::constants::MIN_NEGLIGIBLE_BALANCE
}

/// The demurrage-bounded "reserved" check used when finalizing a transfer:
/// `committed_amount` must not exceed the locked amount decayed by the
/// transfer's demurrage rate between prepare and now. The explicit `* 1.0`
/// promotion to `f64` before comparing is load-bearing: it is what makes
/// this comparison agree with the reference implementation bit-for-bit.
pub fn is_reserved(
    committed_amount: i64,
    locked_amount: i64,
    is_sender_root: bool,
    demurrage_rate: f64,
    prepared_at: Timestamp,
    current_ts: Timestamp,
) -> bool {
    if committed_amount > locked_amount {
        return false;
    }
    if is_sender_root {
        return true;
    }
    let demurrage_seconds = (current_ts - prepared_at).max(0) as f64;
    let ratio = (calc_k(demurrage_rate) * demurrage_seconds).exp();
    debug_assert!(ratio <= 1.0 + 1e-9);
    (committed_amount as f64) * 1.0 <= (locked_amount as f64) * ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_saturates_not_wraps() {
        let (v, overflowed) = contain_principal_overflow(MAX_INT64 as i128 + 1);
        assert_eq!(v, MAX_INT64);
        assert!(overflowed);

        let (v, overflowed) = contain_principal_overflow(MIN_PRINCIPAL as i128 - 1);
        assert_eq!(v, MIN_PRINCIPAL);
        assert!(overflowed);

        let (v, overflowed) = contain_principal_overflow(42);
        assert_eq!(v, 42);
        assert!(!overflowed);
    }

    #[test]
    fn root_account_never_compounds() {
        let b = calc_current_balance(ROOT_CREDITOR_ID, 1000, 500.0, 10.0, 0, 1_000_000);
        assert_eq!(b, 1000.0);
    }

    #[test]
    fn non_positive_balance_does_not_compound() {
        let b = calc_current_balance(1, -10, 0.0, 10.0, 0, 1_000_000);
        assert_eq!(b, -10.0);
    }

    #[test]
    fn due_interest_is_sign_symmetric() {
        let a = calc_due_interest(1000.0, 0, 1_000_000, 5.0, 5.0, 500_000);
        let b = calc_due_interest(-1000.0, 0, 1_000_000, 5.0, 5.0, 500_000);
        assert!((a + b).abs() < 1e-9);
    }

    #[test]
    fn negligible_balance_floor() {
        assert!(is_negligible_balance(1.5, 0.0));
        assert!(is_negligible_balance(0.0, 0.0));
        assert!(!is_negligible_balance(3.0, 0.0));
        assert!(is_negligible_balance(3.0, 5.0));
    }

    #[test]
    fn reserved_check_respects_demurrage_decay() {
        // Zero demurrage rate would violate the (-100, 0] domain, use a tiny
        // negative rate so ratio decays slowly.
        let reserved = is_reserved(100, 100, false, -1.0, 0, 0);
        assert!(reserved, "at t=0 the full locked amount must be reserved");

        let reserved_later = is_reserved(100, 100, false, -50.0, 0, 3600);
        assert!(!reserved_later, "steep demurrage should erode reservation over time");
    }
}
