//! Cashu token parsing and non-consuming validation.
//!
//! A bearer token is "checked, not spent": nothing in this crate has any
//! effect on a token's spendability, so calling it any number of times is
//! safe from the payer's perspective. Actual redemption happens against the
//! wallet service via `satstream-wallet`.
//!
//! Two wire formats are recognized:
//!
//! - `cashuA` - base64url-encoded JSON (V3)
//! - `cashuB` - base64url-encoded CBOR (V4)
//!
//! Development mode additionally accepts `cashu_debug_<n>` tokens so the
//! rest of the pipeline can be exercised without real currency. A hardened
//! validator rejects them like any malformed input.

pub mod format;
pub mod validator;

pub use format::{
    encode_v3, parse, FormatError, ParsedProof, ParsedToken, ProofV3, TokenV3, TokenV3Entry,
};
pub use validator::{debug_amount, debug_token, encoded_amount, TokenValidator, Validation};
