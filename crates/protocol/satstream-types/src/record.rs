//! The per-session payment record.

use serde::{Deserialize, Serialize};

use crate::status::PaymentStatus;
use crate::Amount;

/// Payment state for one conversational session.
///
/// The record is the single source of truth for how much a session has paid
/// and spent. All balance mutation goes through [`activate`](Self::activate),
/// [`deduct`](Self::deduct) and [`apply_topup`](Self::apply_topup), which
/// together maintain the conservation law
/// `spent + balance == face_value + topups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPaymentRecord {
    /// Session/thread identifier this record belongs to.
    pub session_id: String,

    /// Bearer token presented at session start. `None` means the session
    /// runs unmetered (free mode) — only allowed when explicitly configured.
    pub original_token: Option<String>,

    /// Face value of the original token, set once by validation.
    pub face_value: Amount,

    /// Remaining balance (satoshis).
    pub balance: Amount,

    /// Total deducted this session (satoshis).
    pub spent: Amount,

    /// Sum of accepted top-up face values (satoshis).
    pub topups: Amount,

    /// Top-up tokens accepted via funding resumes, in arrival order. Each
    /// is redeemed alongside the original token at completion, or returned
    /// to the payer on error.
    #[serde(default)]
    pub topup_tokens: Vec<String>,

    /// Current payment status.
    pub status: PaymentStatus,

    /// Refund artifact for the unused remainder, created once at
    /// finalization. For error sessions this is the original token verbatim.
    pub refund_token: Option<String>,

    /// Whether the client has retrieved the refund artifact.
    pub refund_claimed: bool,

    /// Metering unit price for this session, immutable once set.
    pub cost_per_operation: Amount,

    /// Unix seconds when the record was created.
    pub created_at: u64,

    /// Unix seconds of the last mutation checkpoint.
    pub updated_at: u64,
}

impl SessionPaymentRecord {
    /// Create a new pending record.
    pub fn new(
        session_id: impl Into<String>,
        original_token: Option<String>,
        cost_per_operation: Amount,
        now: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            original_token,
            face_value: 0,
            balance: 0,
            spent: 0,
            topups: 0,
            topup_tokens: Vec::new(),
            status: PaymentStatus::Pending,
            refund_token: None,
            refund_claimed: false,
            cost_per_operation,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this session is metered (a token was presented).
    pub fn is_metered(&self) -> bool {
        self.original_token.is_some()
    }

    /// Activate a metered session with the validated face value.
    pub fn activate(&mut self, face_value: Amount) {
        self.face_value = face_value;
        self.balance = face_value;
        self.status = PaymentStatus::Active;
    }

    /// Activate an unmetered (free mode) session.
    pub fn activate_free(&mut self) {
        self.status = PaymentStatus::Active;
    }

    /// Whether the balance covers one more operation.
    pub fn can_afford(&self) -> bool {
        self.balance >= self.cost_per_operation
    }

    /// Deduct one operation's cost.
    ///
    /// Returns the new balance, or `None` without mutating anything if the
    /// deduction would drive the balance negative.
    pub fn deduct(&mut self) -> Option<Amount> {
        let remaining = self.balance.checked_sub(self.cost_per_operation)?;
        self.balance = remaining;
        self.spent += self.cost_per_operation;
        Some(remaining)
    }

    /// Credit a validated top-up and return to `Active`.
    ///
    /// The token is retained for redemption at completion (or return to the
    /// payer on error).
    pub fn apply_topup(&mut self, amount: Amount, token: String) {
        self.balance += amount;
        self.topups += amount;
        self.topup_tokens.push(token);
        self.status = PaymentStatus::Active;
    }

    /// Every token this session holds: the original plus any top-ups.
    pub fn all_tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        if let Some(original) = &self.original_token {
            tokens.push(original.clone());
        }
        tokens.extend(self.topup_tokens.iter().cloned());
        tokens
    }

    /// Conservation law: everything paid in is either spent or still held.
    pub fn conservation_holds(&self) -> bool {
        self.spent + self.balance == self.face_value + self.topups
    }

    /// Whether the record has been finalized (no further fund movement).
    pub fn is_finalized(&self) -> bool {
        self.status.is_terminal()
    }
}
