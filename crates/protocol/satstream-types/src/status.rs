//! Session payment status.

use serde::{Deserialize, Serialize};

/// Status of a session's payment record.
///
/// Transitions are driven by the metering state machine:
///
/// ```text
/// pending ──▶ active ──▶ completed ──▶ refunded
///    │           │  ▲          ▲
///    │           ▼  │          │
///    │       exhausted ──▶ error ──▶ refunded
///    └──────────────────────▲
/// ```
///
/// `pending` becomes `error` directly when token validation fails before any
/// billable operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PaymentStatus {
    /// Session created, token not yet validated.
    Pending = 0,
    /// Token validated (or free mode), billable operations may proceed.
    Active = 1,
    /// Balance below cost of the next operation; awaiting a funding resume.
    Exhausted = 2,
    /// Work finished successfully; redemption and refund handling done.
    Completed = 3,
    /// Validation or work failed; the payer keeps their funds.
    Error = 4,
    /// The client has retrieved the refund artifact.
    Refunded = 5,
}

impl PaymentStatus {
    /// Convert a stored discriminant back into a status.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Pending),
            1 => Some(Self::Active),
            2 => Some(Self::Exhausted),
            3 => Some(Self::Completed),
            4 => Some(Self::Error),
            5 => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Whether the session has reached a terminal state.
    ///
    /// `Completed` and `Error` still allow the refund-claim transition to
    /// `Refunded`, but no further billable operations or fund movement.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Refunded)
    }

    /// Whether billable operations may currently be charged.
    pub fn is_chargeable(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}
