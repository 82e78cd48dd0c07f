//! Protocol constants: pricing defaults, token formats, and the funding
//! interrupt action identifier.

use crate::Amount;

// =============================================================================
// Pricing
// =============================================================================

/// Default cost per billable operation (satoshis).
pub const DEFAULT_COST_PER_OPERATION: Amount = 10;

/// Default suggested top-up amount in a funding request (satoshis).
pub const DEFAULT_SUGGESTED_TOPUP: Amount = 100;

// =============================================================================
// Token Formats
// =============================================================================

/// Prefix of a V3 Cashu token (base64url-encoded JSON).
pub const TOKEN_PREFIX_V3: &str = "cashuA";

/// Prefix of a V4 Cashu token (base64url-encoded CBOR).
pub const TOKEN_PREFIX_V4: &str = "cashuB";

/// Prefix of a development-mode debug token with an embedded amount,
/// e.g. `cashu_debug_50`.
pub const DEBUG_TOKEN_PREFIX: &str = "cashu_debug_";

/// Bare debug token accepted in development mode.
pub const DEBUG_TOKEN_BARE: &str = "debug";

/// Face value assumed for a debug token without a parsable amount.
pub const DEBUG_TOKEN_DEFAULT_AMOUNT: Amount = 100;

/// Minimum decoded payload size for a token to be considered plausible.
pub const MIN_TOKEN_PAYLOAD_BYTES: usize = 10;

/// Currency unit carried in issued tokens.
pub const DEFAULT_UNIT: &str = "sat";

// =============================================================================
// Funding Interrupt
// =============================================================================

/// Machine-readable action identifier in a funding request.
pub const FUNDING_ACTION: &str = "request_additional_funding";

// =============================================================================
// Wallet Service
// =============================================================================

/// Default base URL of the wallet service API.
pub const DEFAULT_WALLET_URL: &str = "http://127.0.0.1:8350/api/wallet";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_defaults_sane() {
        assert!(DEFAULT_COST_PER_OPERATION > 0);
        assert!(DEFAULT_SUGGESTED_TOPUP >= DEFAULT_COST_PER_OPERATION);
    }

    #[test]
    fn test_token_prefixes_distinct() {
        assert_ne!(TOKEN_PREFIX_V3, TOKEN_PREFIX_V4);
        assert!(DEBUG_TOKEN_PREFIX.starts_with("cashu_"));
    }
}
