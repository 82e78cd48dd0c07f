//! Non-consuming token validation.

use tracing::debug;

use satstream_types::constants::{
    DEBUG_TOKEN_BARE, DEBUG_TOKEN_DEFAULT_AMOUNT, DEBUG_TOKEN_PREFIX,
};
use satstream_types::Amount;

use crate::format::{self, FormatError};

/// Outcome of validating a token.
///
/// Validation never errors to the caller: all failure is reported through
/// this struct, with a human-readable message in `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the token is acceptable.
    pub valid: bool,
    /// Face value in satoshis (0 when invalid).
    pub amount: Amount,
    /// Human-readable reason when invalid.
    pub error: Option<String>,
}

impl Validation {
    fn ok(amount: Amount) -> Self {
        Self {
            valid: true,
            amount,
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            amount: 0,
            error: Some(error.into()),
        }
    }
}

/// Validates bearer tokens without spending them.
///
/// Calling [`validate`](Self::validate) has no effect on a token's
/// spendability — it decodes the token and sums its proofs, it never talks
/// to a mint. A missing token is not a validation concern: callers decide
/// about free mode before invoking the validator.
#[derive(Debug, Clone, Copy)]
pub struct TokenValidator {
    dev_mode: bool,
}

impl TokenValidator {
    /// Create a validator. `dev_mode` enables debug tokens and must never be
    /// set in a hardened deployment.
    pub fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }

    /// Hardened validator: real tokens only.
    pub fn hardened() -> Self {
        Self::new(false)
    }

    /// Development validator: accepts `cashu_debug_<n>` tokens.
    pub fn development() -> Self {
        Self::new(true)
    }

    /// Whether debug tokens are accepted.
    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Validate a token and determine its face value.
    pub fn validate(&self, token: &str) -> Validation {
        let token = token.trim();
        if token.is_empty() {
            return Validation::invalid("No token provided");
        }

        if self.dev_mode {
            if let Some(amount) = debug_amount(token) {
                debug!(amount, "accepted debug token (development mode)");
                return Validation::ok(amount);
            }
        }

        match format::parse(token) {
            Ok(parsed) => {
                debug!(
                    amount = parsed.amount,
                    proofs = parsed.proofs.len(),
                    mint = ?parsed.mint,
                    "token format valid"
                );
                Validation::ok(parsed.amount)
            }
            Err(FormatError::UnknownPrefix { prefix }) => {
                Validation::invalid(format!("Unknown token format: {}...", prefix))
            }
            Err(e) => Validation::invalid(format!("Malformed token: {}", e)),
        }
    }
}

/// Build a debug token carrying the given amount.
pub fn debug_token(amount: Amount) -> String {
    format!("{}{}", DEBUG_TOKEN_PREFIX, amount)
}

/// The amount embedded in a debug token, if it is one.
///
/// `cashu_debug_<n>` carries `n`; a bare `debug` (or an unparsable suffix)
/// carries the default amount.
pub fn debug_amount(token: &str) -> Option<Amount> {
    if token == DEBUG_TOKEN_BARE {
        return Some(DEBUG_TOKEN_DEFAULT_AMOUNT);
    }
    let suffix = token.strip_prefix(DEBUG_TOKEN_PREFIX)?;
    Some(suffix.parse().unwrap_or(DEBUG_TOKEN_DEFAULT_AMOUNT))
}

/// The amount encoded in any token artifact this system handles: a real
/// token's proof sum, or a debug token's embedded amount.
pub fn encoded_amount(token: &str) -> Option<Amount> {
    if let Some(amount) = debug_amount(token) {
        return Some(amount);
    }
    format::parse(token).ok().map(|parsed| parsed.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{encode_v3, ProofV3, TokenV3, TokenV3Entry};

    fn real_token(amount: Amount) -> String {
        encode_v3(&TokenV3 {
            token: vec![TokenV3Entry {
                mint: "https://mint.example.com/Bitcoin".to_string(),
                proofs: vec![ProofV3 {
                    id: "009a1f293253e41e".to_string(),
                    amount,
                    secret: "407915bc212be61a77e3e6d2aeb4c727980bda51cd06a6afc29e2861768a7837"
                        .to_string(),
                    c: "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                        .to_string(),
                }],
            }],
            unit: Some("sat".to_string()),
            memo: None,
        })
    }

    #[test]
    fn test_validate_real_token() {
        let validator = TokenValidator::hardened();
        let result = validator.validate(&real_token(100));
        assert!(result.valid);
        assert_eq!(result.amount, 100);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_validate_is_idempotent() {
        // Check, don't spend: repeated validation returns the same result.
        let validator = TokenValidator::hardened();
        let token = real_token(64);
        for _ in 0..3 {
            let result = validator.validate(&token);
            assert!(result.valid);
            assert_eq!(result.amount, 64);
        }
    }

    #[test]
    fn test_validate_malformed_token() {
        let validator = TokenValidator::hardened();
        let result = validator.validate("notcashu123");
        assert!(!result.valid);
        assert_eq!(result.amount, 0);
        assert!(result.error.as_deref().unwrap().starts_with("Unknown token format"));
    }

    #[test]
    fn test_validate_empty_token() {
        let validator = TokenValidator::hardened();
        let result = validator.validate("");
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("No token provided"));
    }

    #[test]
    fn test_debug_token_dev_mode_only() {
        let dev = TokenValidator::development();
        let result = dev.validate("cashu_debug_50");
        assert!(result.valid);
        assert_eq!(result.amount, 50);

        // Hardened deployments treat the same token as malformed.
        let hardened = TokenValidator::hardened();
        let result = hardened.validate("cashu_debug_50");
        assert!(!result.valid);
    }

    #[test]
    fn test_bare_debug_token() {
        let dev = TokenValidator::development();
        let result = dev.validate("debug");
        assert!(result.valid);
        assert_eq!(result.amount, DEBUG_TOKEN_DEFAULT_AMOUNT);
    }

    #[test]
    fn test_debug_token_unparsable_suffix_uses_default() {
        let dev = TokenValidator::development();
        let result = dev.validate("cashu_debug_banana");
        assert!(result.valid);
        assert_eq!(result.amount, DEBUG_TOKEN_DEFAULT_AMOUNT);
    }

    #[test]
    fn test_encoded_amount() {
        assert_eq!(encoded_amount(&debug_token(75)), Some(75));
        assert_eq!(encoded_amount(&real_token(128)), Some(128));
        assert_eq!(encoded_amount("garbage"), None);
    }

    #[test]
    fn test_real_token_works_in_dev_mode_too() {
        let dev = TokenValidator::development();
        let result = dev.validate(&real_token(32));
        assert!(result.valid);
        assert_eq!(result.amount, 32);
    }
}
