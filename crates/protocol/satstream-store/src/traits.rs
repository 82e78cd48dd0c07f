//! Storage trait definitions.
//!
//! All storage components are defined as traits, allowing for alternative
//! implementations (e.g. in-memory stores for testing). The default
//! implementations use SQLite.

use satstream_types::{Amount, SessionPaymentRecord};

use crate::error::Result;

/// Why a token landed in the recovery log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecoveryReason {
    /// Work succeeded but redemption failed; the token must be redeemed
    /// manually by an operator.
    RedemptionFailed = 0,
    /// Work failed; the token was never redeemed and is returned to the
    /// payer. Logged so operators can cross-check client claims.
    WorkFailed = 1,
}

impl RecoveryReason {
    /// Convert a stored discriminant back into a reason.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::RedemptionFailed),
            1 => Some(Self::WorkFailed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::RedemptionFailed => "redemption_failed",
            Self::WorkFailed => "work_failed",
        };
        write!(f, "{}", s)
    }
}

/// A recovery log entry as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEntry {
    /// Row identifier (append order).
    pub id: i64,
    /// Session the token belonged to.
    pub session_id: String,
    /// Why the token is here.
    pub reason: RecoveryReason,
    /// The token, in full plaintext.
    pub token: String,
    /// Amount encoded by the token, when known.
    pub amount: Option<Amount>,
    /// Unix seconds when the entry was appended.
    pub logged_at: u64,
}

/// Durable storage for session payment records.
pub trait SessionStore: Send {
    /// Insert or replace a session record.
    fn upsert(&mut self, record: &SessionPaymentRecord) -> Result<()>;

    /// Load a session record by ID.
    fn get(&self, session_id: &str) -> Result<Option<SessionPaymentRecord>>;

    /// List records that have not reached a terminal status.
    ///
    /// Used after a restart to resume suspended sessions.
    fn list_unfinished(&self) -> Result<Vec<SessionPaymentRecord>>;

    /// Delete a session record.
    fn delete(&mut self, session_id: &str) -> Result<()>;
}

/// Append-only channel for tokens that need operator attention.
pub trait RecoveryLog: Send {
    /// Append an entry. Returns the entry ID.
    fn append(
        &mut self,
        session_id: &str,
        reason: RecoveryReason,
        token: &str,
        amount: Option<Amount>,
        logged_at: u64,
    ) -> Result<i64>;

    /// List all entries in append order.
    fn entries(&self) -> Result<Vec<RecoveryEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_roundtrip() {
        assert_eq!(
            RecoveryReason::from_u8(RecoveryReason::RedemptionFailed as u8),
            Some(RecoveryReason::RedemptionFailed)
        );
        assert_eq!(
            RecoveryReason::from_u8(RecoveryReason::WorkFailed as u8),
            Some(RecoveryReason::WorkFailed)
        );
        assert_eq!(RecoveryReason::from_u8(7), None);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(RecoveryReason::RedemptionFailed.to_string(), "redemption_failed");
        assert_eq!(RecoveryReason::WorkFailed.to_string(), "work_failed");
    }
}
