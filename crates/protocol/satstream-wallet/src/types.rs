//! Wire types for the wallet service API.
//!
//! These shapes are shared by the HTTP client here and the walletd handlers:
//! `POST /receive`, `GET /balance`, `POST /sweep`, `POST /send`.

use serde::{Deserialize, Serialize};

use satstream_types::Amount;

/// Request to receive (redeem) an ecash token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveRequest {
    /// The full token text.
    pub token: String,
}

/// Response from receiving a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponse {
    /// Whether the proofs were accepted and stored.
    pub success: bool,
    /// Amount credited (0 on failure).
    pub amount: Amount,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response with the settled wallet balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Total balance across all stored proofs.
    pub balance: Amount,
}

/// Response from sweeping all funds into a single token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    /// Whether a sweep token was produced.
    pub success: bool,
    /// Amount contained in the sweep token.
    pub amount: Amount,
    /// The sweep token (present on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Failure reason (including "no funds to sweep").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request for an exact-amount send token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Amount to include in the token.
    pub amount: Amount,
}

/// Response from creating a send token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    /// Whether the token was created.
    pub success: bool,
    /// Amount contained in the token.
    pub amount: Amount,
    /// The send token (present on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_response_omits_absent_error() {
        let response = ReceiveResponse {
            success: true,
            amount: 100,
            error: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_receive_response_parses_without_error_field() {
        let response: ReceiveResponse =
            serde_json::from_str(r#"{"success":true,"amount":42}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.amount, 42);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_sweep_response_roundtrip() {
        let response = SweepResponse {
            success: false,
            amount: 0,
            token: None,
            error: Some("no funds to sweep".to_string()),
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: SweepResponse = serde_json::from_str(&json).unwrap();
        assert!(!back.success);
        assert_eq!(back.error.as_deref(), Some("no funds to sweep"));
    }
}
