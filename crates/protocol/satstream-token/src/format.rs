//! Cashu token wire formats.
//!
//! Implements decoding of the two serialized token formats:
//!
//! - V3 (`cashuA` prefix): base64url JSON with a list of per-mint entries,
//!   each carrying proofs with an `amount` and a `secret`.
//! - V4 (`cashuB` prefix): base64url CBOR with single-letter keys
//!   (`m` mint, `u` unit, `t` entries, `p` proofs, `a` amount, `s` secret).
//!
//! Decoding is strictly read-only; the proofs are never presented to a mint
//! from here.

use base64::Engine as _;
use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use satstream_types::constants::{MIN_TOKEN_PAYLOAD_BYTES, TOKEN_PREFIX_V3, TOKEN_PREFIX_V4};
use satstream_types::Amount;

/// Result type for token format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while decoding a serialized token.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The token does not start with a recognized prefix.
    #[error("unknown token prefix: {prefix:?}")]
    UnknownPrefix {
        /// The first few characters of the rejected token.
        prefix: String,
    },

    /// The payload is not valid base64url.
    #[error("base64 decode error: {0}")]
    Decode(String),

    /// The decoded payload is implausibly short.
    #[error("token payload too short: {len} bytes")]
    PayloadTooShort {
        /// Decoded payload length.
        len: usize,
    },

    /// The JSON payload of a V3 token could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(String),

    /// The CBOR payload of a V4 token could not be parsed.
    #[error("CBOR parse error: {0}")]
    Cbor(String),

    /// The token carries no proofs.
    #[error("token carries no proofs")]
    NoProofs,

    /// Proof amounts overflow the accumulator.
    #[error("proof amounts overflow")]
    Overflow,
}

// =============================================================================
// V3 (JSON) structures
// =============================================================================

/// A V3 token: one or more per-mint entries plus optional metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenV3 {
    /// Per-mint proof bundles.
    pub token: Vec<TokenV3Entry>,
    /// Currency unit (usually "sat").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Optional free-form memo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Proofs issued by a single mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenV3Entry {
    /// Mint URL the proofs belong to.
    pub mint: String,
    /// The bearer proofs.
    pub proofs: Vec<ProofV3>,
}

/// A single ecash proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofV3 {
    /// Keyset identifier.
    pub id: String,
    /// Denomination in the token's unit.
    pub amount: Amount,
    /// The proof secret (doubles as the double-spend key).
    pub secret: String,
    /// Mint signature over the secret.
    #[serde(rename = "C")]
    pub c: String,
}

/// A single proof as the payment core sees it: its denomination and the
/// secret used for double-spend detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedProof {
    /// The proof secret.
    pub secret: String,
    /// Denomination in the token's unit.
    pub amount: Amount,
}

/// A token decoded down to what the payment core needs: its face value,
/// origin mint, and the proofs it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken {
    /// Mint URL of the first entry, if present.
    pub mint: Option<String>,
    /// Currency unit, if declared.
    pub unit: Option<String>,
    /// Sum of all proof amounts.
    pub amount: Amount,
    /// Every proof in the token, in order.
    pub proofs: Vec<ParsedProof>,
}

/// Decode a serialized Cashu token (either format) without consuming it.
pub fn parse(token: &str) -> FormatResult<ParsedToken> {
    if let Some(payload) = token.strip_prefix(TOKEN_PREFIX_V3) {
        let bytes = decode_payload(payload)?;
        parse_v3(&bytes)
    } else if let Some(payload) = token.strip_prefix(TOKEN_PREFIX_V4) {
        let bytes = decode_payload(payload)?;
        parse_v4(&bytes)
    } else {
        Err(FormatError::UnknownPrefix {
            prefix: token.chars().take(10).collect(),
        })
    }
}

/// Encode a V3 token to its `cashuA...` wire form.
pub fn encode_v3(token: &TokenV3) -> String {
    // Serialization of our own plain structs cannot fail.
    let json = serde_json::to_vec(token).expect("V3 token serialization");
    format!(
        "{}{}",
        TOKEN_PREFIX_V3,
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    )
}

/// Decode a base64url payload, tolerating present-or-absent padding.
fn decode_payload(payload: &str) -> FormatResult<Vec<u8>> {
    let trimmed = payload.trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| FormatError::Decode(e.to_string()))?;

    if bytes.len() < MIN_TOKEN_PAYLOAD_BYTES {
        return Err(FormatError::PayloadTooShort { len: bytes.len() });
    }
    Ok(bytes)
}

fn parse_v3(bytes: &[u8]) -> FormatResult<ParsedToken> {
    let token: TokenV3 =
        serde_json::from_slice(bytes).map_err(|e| FormatError::Json(e.to_string()))?;

    let mut amount: Amount = 0;
    let mut proofs = Vec::new();
    for entry in &token.token {
        for proof in &entry.proofs {
            amount = amount.checked_add(proof.amount).ok_or(FormatError::Overflow)?;
            proofs.push(ParsedProof {
                secret: proof.secret.clone(),
                amount: proof.amount,
            });
        }
    }
    if proofs.is_empty() {
        return Err(FormatError::NoProofs);
    }

    Ok(ParsedToken {
        mint: token.token.first().map(|e| e.mint.clone()),
        unit: token.unit,
        amount,
        proofs,
    })
}

fn parse_v4(bytes: &[u8]) -> FormatResult<ParsedToken> {
    let value: Value =
        ciborium::de::from_reader(bytes).map_err(|e| FormatError::Cbor(e.to_string()))?;
    let map = value
        .as_map()
        .ok_or_else(|| FormatError::Cbor("top-level value is not a map".to_string()))?;

    let mint = map_get(map, "m").and_then(value_text);
    let unit = map_get(map, "u").and_then(value_text);

    let entries = map_get(map, "t")
        .and_then(|v| v.as_array())
        .ok_or_else(|| FormatError::Cbor("missing token entries (t)".to_string()))?;

    let mut amount: Amount = 0;
    let mut parsed_proofs = Vec::new();
    for entry in entries {
        let entry_map = entry
            .as_map()
            .ok_or_else(|| FormatError::Cbor("token entry is not a map".to_string()))?;
        let proofs = map_get(entry_map, "p")
            .and_then(|v| v.as_array())
            .ok_or_else(|| FormatError::Cbor("missing proofs (p)".to_string()))?;

        for proof in proofs {
            let proof_map = proof
                .as_map()
                .ok_or_else(|| FormatError::Cbor("proof is not a map".to_string()))?;
            let denomination = map_get(proof_map, "a")
                .and_then(value_u64)
                .ok_or_else(|| FormatError::Cbor("proof missing amount (a)".to_string()))?;
            amount = amount
                .checked_add(denomination)
                .ok_or(FormatError::Overflow)?;

            let secret = map_get(proof_map, "s")
                .and_then(value_text)
                .ok_or_else(|| FormatError::Cbor("proof missing secret (s)".to_string()))?;
            parsed_proofs.push(ParsedProof {
                secret,
                amount: denomination,
            });
        }
    }
    if parsed_proofs.is_empty() {
        return Err(FormatError::NoProofs);
    }

    Ok(ParsedToken {
        mint,
        unit,
        amount,
        proofs: parsed_proofs,
    })
}

/// Look up a text key in a CBOR map.
fn map_get<'a>(map: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
}

fn value_text(value: &Value) -> Option<String> {
    value.as_text().map(str::to_string)
}

fn value_u64(value: &Value) -> Option<Amount> {
    let integer = value.as_integer()?;
    u64::try_from(i128::from(integer)).ok()
}
