use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Aggregate balance row keyed by `(chain_id, asset_id, address)`.
///
/// Only the accumulator mutates the counters: `utxo_count` rises and falls
/// with output creation and redemption, the totals and `transaction_count`
/// only grow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulateBalance {
    pub id: String,
    pub chain_id: String,
    pub asset_id: String,
    pub address: String,
    pub utxo_count: i64,
    pub total_received: Decimal,
    pub total_sent: Decimal,
    pub transaction_count: i64,
}

impl AccumulateBalance {
    /// Build a zeroed balance for the given key components, with `id` set to
    /// the deterministic balance key.
    pub fn keyed(chain_id: String, asset_id: String, address: String) -> Self {
        Self {
            id: balance_key(&chain_id, &asset_id, &address),
            chain_id,
            asset_id,
            address,
            utxo_count: 0,
            total_received: Decimal::ZERO,
            total_sent: Decimal::ZERO,
            transaction_count: 0,
        }
    }
}

/// Deterministic identifier of an aggregate balance row: hex-encoded SHA-256
/// over the space-joined key components.
pub fn balance_key(chain_id: &str, asset_id: &str, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(b" ");
    hasher.update(asset_id.as_bytes());
    hasher.update(b" ");
    hasher.update(address.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let a = balance_key("2oYMBNV4eNHyqk2fjjV5nVQLDbtmNJzq5s3qs3Lo6ftnC6FByM", "FvwEAhmxKfeiG8SnEvq42hc6whRyY3EFYAvebMqDNDGCgxN5Z", "avax1xpmt0ljr9qa34q0c2etw3wmnwhjqak8sm68tx0");
        let b = balance_key("2oYMBNV4eNHyqk2fjjV5nVQLDbtmNJzq5s3qs3Lo6ftnC6FByM", "FvwEAhmxKfeiG8SnEvq42hc6whRyY3EFYAvebMqDNDGCgxN5Z", "avax1xpmt0ljr9qa34q0c2etw3wmnwhjqak8sm68tx0");
        assert_eq!(a, b);
    }

    #[test]
    fn any_component_changes_the_key() {
        let base = balance_key("chain", "asset", "addr");
        assert_ne!(base, balance_key("chain2", "asset", "addr"));
        assert_ne!(base, balance_key("chain", "asset2", "addr"));
        assert_ne!(base, balance_key("chain", "asset", "addr2"));
    }

    #[test]
    fn component_boundaries_are_unambiguous() {
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(balance_key("ab", "c", "addr"), balance_key("a", "bc", "addr"));
    }

    #[test]
    fn key_is_hex_encoded_digest() {
        let key = balance_key("chain", "asset", "addr");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn keyed_balance_starts_zeroed() {
        let balance =
            AccumulateBalance::keyed("chain".to_string(), "asset".to_string(), "addr".to_string());
        assert_eq!(balance.id, balance_key("chain", "asset", "addr"));
        assert_eq!(balance.utxo_count, 0);
        assert_eq!(balance.total_received, Decimal::ZERO);
        assert_eq!(balance.total_sent, Decimal::ZERO);
        assert_eq!(balance.transaction_count, 0);
    }
}
