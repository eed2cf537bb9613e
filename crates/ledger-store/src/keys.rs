//! Big-endian key encoding so sled's lexicographic ordering matches numeric
//! ordering — this is what makes prefix scans over one account's rows
//! (transfer requests, prepared transfers, pending balance changes) return
//! results in id order without a secondary sort.

use ledger_core::AccountKey;

pub fn encode_i64(v: i64) -> [u8; 8] {
    // Flip the sign bit so two's-complement ordering matches byte ordering.
    ((v as u64) ^ (1u64 << 63)).to_be_bytes()
}

pub fn decode_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    (u64::from_be_bytes(buf) ^ (1u64 << 63)) as i64
}

pub fn account_key_bytes(key: &AccountKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&encode_i64(key.debtor_id));
    out.extend_from_slice(&encode_i64(key.creditor_id));
    out
}

pub fn account_key_with_suffix(key: &AccountKey, suffix: i64) -> Vec<u8> {
    let mut out = account_key_bytes(key);
    out.extend_from_slice(&encode_i64(suffix));
    out
}

/// Key for the pending-balance-change index: `idx_changed_account` scans
/// by `(debtor_id, creditor_id)` then by `change_id` to get commit order.
pub fn changed_account_index_bytes(debtor_id: i64, creditor_id: i64, change_id: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&encode_i64(debtor_id));
    out.extend_from_slice(&encode_i64(creditor_id));
    out.extend_from_slice(&encode_i64(change_id));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_encoding_preserves_order() {
        let mut values = vec![-100i64, -1, 0, 1, 100, i64::MIN, i64::MAX];
        let mut encoded: Vec<([u8; 8], i64)> = values.iter().map(|&v| (encode_i64(v), v)).collect();
        encoded.sort_by(|a, b| a.0.cmp(&b.0));
        values.sort();
        let resorted: Vec<i64> = encoded.iter().map(|(_, v)| *v).collect();
        assert_eq!(resorted, values);
    }

    #[test]
    fn roundtrip() {
        for v in [-1i64, 0, 1, i64::MIN, i64::MAX, 123456789] {
            assert_eq!(decode_i64(&encode_i64(v)), v);
        }
    }
}
