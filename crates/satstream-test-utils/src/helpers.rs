//! Helpers for building test fixtures.

use std::sync::atomic::{AtomicU64, Ordering};

use satstream_token::{encode_v3, ProofV3, TokenV3, TokenV3Entry};
use satstream_types::Amount;

/// Monotonic counter so every generated proof secret is unique within a
/// test process.
static SECRET_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Build a real-format (V3) token worth `amount`, with a unique secret.
pub fn real_token(amount: Amount) -> String {
    let n = SECRET_COUNTER.fetch_add(1, Ordering::Relaxed);
    encode_v3(&TokenV3 {
        token: vec![TokenV3Entry {
            mint: "https://mint.test.example/Bitcoin".to_string(),
            proofs: vec![ProofV3 {
                id: "009a1f293253e41e".to_string(),
                amount,
                secret: format!("test-secret-{:016x}", n),
                c: "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                    .to_string(),
            }],
        }],
        unit: Some("sat".to_string()),
        memo: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use satstream_token::encoded_amount;

    #[test]
    fn test_real_token_parses_to_amount() {
        let token = real_token(150);
        assert!(token.starts_with("cashuA"));
        assert_eq!(encoded_amount(&token), Some(150));
    }

    #[test]
    fn test_real_tokens_are_distinct() {
        assert_ne!(real_token(10), real_token(10));
    }
}
