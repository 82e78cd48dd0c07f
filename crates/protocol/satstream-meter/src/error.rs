//! Error types for the metering state machine.
//!
//! Exhaustion is deliberately absent here: running out of balance is a
//! control-flow outcome (`ChargeOutcome::Exhausted`), not an error.

use thiserror::Error;

use satstream_store::StoreError;
use satstream_types::{FundingError, PaymentStatus};

/// Result type alias for metering operations.
pub type MeterResult<T> = Result<T, MeterError>;

/// Errors that can occur while metering a session.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The presented token failed validation. Terminal for the session: no
    /// retry, no fund movement, the user must start over with a valid token.
    #[error("payment validation failed: {reason}")]
    Validation {
        /// Human-readable reason.
        reason: String,
    },

    /// An operation was attempted in a state that does not allow it.
    #[error("cannot {action} while session is {from}")]
    InvalidTransition {
        /// Current status.
        from: PaymentStatus,
        /// Attempted action.
        action: &'static str,
    },

    /// A resume payload could not be interpreted.
    #[error(transparent)]
    Resume(#[from] FundingError),

    /// The session store failed.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

impl MeterError {
    /// Plain, non-technical message suitable for the end user. Raw detail
    /// stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { .. } => {
                "Payment could not be validated. No funds were taken - please retry \
                 with a valid token."
                    .to_string()
            }
            Self::InvalidTransition { .. } | Self::Resume(_) | Self::Store(_) => {
                "Something went wrong processing your payment. No funds were taken."
                    .to_string()
            }
        }
    }
}
