//! Funding-interrupt payloads.
//!
//! When a metered session exhausts its balance mid-run, the meter suspends
//! and emits a [`FundingRequest`] to the external caller. The caller answers
//! with a [`ResumePayload`]. Both types are plain serializable events: the
//! core assumes nothing about the concurrency primitive carrying them, only
//! that session state was checkpointed before suspending.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::FUNDING_ACTION;
use crate::Amount;

/// Error raised when a resume payload cannot be interpreted.
#[derive(Debug, Error)]
pub enum FundingError {
    /// The payload did not match any known resume shape.
    #[error("unrecognized resume payload: {reason}")]
    UnrecognizedPayload {
        /// Description of what failed to parse.
        reason: String,
    },
}

/// Structured request emitted when a session runs out of funds.
///
/// Serialized to the external caller, who may approve with a new token,
/// reject, or edit the suggested amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingRequest {
    /// Machine-readable action identifier ([`FUNDING_ACTION`]).
    pub action: String,

    /// Session this request belongs to.
    pub session_id: String,

    /// Total spent so far this session (satoshis).
    pub spent_so_far: Amount,

    /// Suggested top-up amount (satoshis).
    pub suggested_amount: Amount,

    /// Human-readable explanation for the end user.
    pub message: String,
}

impl FundingRequest {
    /// Build a funding request for an exhausted session.
    pub fn new(session_id: impl Into<String>, spent_so_far: Amount, suggested_amount: Amount) -> Self {
        Self {
            action: FUNDING_ACTION.to_string(),
            session_id: session_id.into(),
            spent_so_far,
            suggested_amount,
            message: format!(
                "Payment balance exhausted after spending {} sats. \
                 Additional funds are needed to continue.",
                spent_so_far
            ),
        }
    }
}

/// The caller's answer to a funding request.
///
/// A single tagged enum with an explicit discriminant replaces the loose
/// dictionary shapes a client might otherwise send; anything without a
/// valid `decision` tag and the fields that variant requires is rejected
/// with a typed error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ResumePayload {
    /// Approve: continue with a fresh token.
    Approve {
        /// New bearer token covering the top-up.
        token: String,
    },
    /// Reject: terminate the session without further work.
    Reject,
    /// Edit: approve with an adjusted suggested amount. A token is still
    /// required for the session to actually resume.
    Edit {
        /// Adjusted top-up amount (satoshis).
        suggested_amount: Amount,
        /// New bearer token covering the top-up.
        token: String,
    },
}

impl ResumePayload {
    /// Parse a resume payload from a JSON value, rejecting unknown shapes.
    pub fn parse(value: &serde_json::Value) -> Result<Self, FundingError> {
        serde_json::from_value(value.clone()).map_err(|e| FundingError::UnrecognizedPayload {
            reason: e.to_string(),
        })
    }

    /// The token carried by this payload, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Approve { token } | Self::Edit { token, .. } => Some(token),
            Self::Reject => None,
        }
    }
}
