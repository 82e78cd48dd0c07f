//! Error types for the storage layer.

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error (directory creation, file access).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A mutex guarding the connection was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Session record not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Stored data could not be interpreted.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Create a new LockPoisoned error.
    pub fn lock_poisoned(msg: impl Into<String>) -> Self {
        Self::LockPoisoned(msg.into())
    }

    /// Create a new InvalidData error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::SessionNotFound("session-1".to_string());
        assert_eq!(err.to_string(), "session not found: session-1");
    }

    #[test]
    fn test_invalid_data_helper() {
        let err = StoreError::invalid_data("bad status discriminant");
        assert!(err.to_string().contains("bad status discriminant"));
    }
}
