//! Error types for wallet operations.

use thiserror::Error;

use satstream_types::Amount;

/// Result type alias for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Errors that can occur talking to the wallet service.
#[derive(Debug, Error)]
pub enum WalletError {
    /// The wallet refused the operation (bad token, mint rejection).
    #[error("wallet rejected operation: {reason}")]
    Rejected {
        /// Reason reported by the wallet.
        reason: String,
    },

    /// Not enough settled balance for a send.
    #[error("insufficient wallet balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Available balance
        have: Amount,
        /// Required balance
        need: Amount,
    },

    /// Network error (retryable).
    #[error("wallet network error: {0}")]
    Network(String),

    /// Timeout error (retryable).
    #[error("wallet operation timed out: {0}")]
    Timeout(String),

    /// The wallet answered with something the client cannot interpret.
    #[error("unexpected wallet response: {0}")]
    Protocol(String),

    /// Internal error (lock poisoning, unexpected state).
    #[error("internal wallet error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Create a new Rejected error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create a new Network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new Timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new Protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(WalletError::network("connection refused").is_retryable());
        assert!(WalletError::timeout("deadline exceeded").is_retryable());
        assert!(!WalletError::rejected("already spent").is_retryable());
        assert!(!WalletError::InsufficientBalance { have: 5, need: 10 }.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = WalletError::InsufficientBalance { have: 5, need: 10 };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains("10"));
    }
}
