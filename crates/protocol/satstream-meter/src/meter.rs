//! The metering state machine.
//!
//! `SessionMeter` is the single source of truth for the payment lifecycle:
//! 1. Validate the presented token without spending it
//! 2. Deduct the unit price before each billable operation
//! 3. Suspend with a funding request when the balance is exhausted
//! 4. Redeem held tokens only after the work is confirmed complete
//! 5. Surface a refund artifact (or the original token) for every remainder
//!
//! One meter owns one session's record; all mutators take `&mut self`, so a
//! session never has two operations in flight. Every transition is
//! checkpointed to the session store before control returns, which is what
//! makes indefinite suspension and crash recovery possible.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use satstream_store::{RecoveryLog, SessionStore};
use satstream_token::TokenValidator;
use satstream_wallet::{Redemption, WalletBackend};
use satstream_types::{
    Amount, FundingRequest, PaymentStatus, ResumePayload, SessionPaymentRecord,
};

use crate::config::MeterConfig;
use crate::error::{MeterError, MeterResult};
use crate::recovery::{now_secs, synthesize_refund, RecoveryLogger};

/// Outcome of charging one billable operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The deduction was committed; the operation may execute.
    Charged {
        /// Balance remaining after the deduction.
        balance: Amount,
    },
    /// Free mode: the session is unmetered, nothing was deducted.
    Unmetered,
    /// Balance below the unit price. Nothing was deducted, the session is
    /// suspended, and this request must be answered before work continues.
    Exhausted(FundingRequest),
}

/// Outcome of answering a funding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Top-up accepted; billable operations may continue.
    Resumed {
        /// Balance after the top-up.
        balance: Amount,
    },
    /// Funding declined; the session is terminated.
    Terminated,
}

/// Terminal summary of a session's payment, handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReceipt {
    /// Session identifier.
    pub session_id: String,
    /// Final payment status.
    pub status: PaymentStatus,
    /// Total deducted.
    pub spent: Amount,
    /// Remainder at finalization.
    pub balance: Amount,
    /// Whether the caller holds a refund artifact to present to the user.
    pub refund: bool,
    /// The refund artifact: a freshly minted token for the remainder on
    /// success, or the original token verbatim on error.
    pub refund_token: Option<String>,
    /// On error: every token returned to the payer unredeemed (the original
    /// plus any top-ups).
    pub returned_tokens: Vec<String>,
}

/// Meters one session's billable operations against its payment record.
pub struct SessionMeter {
    record: SessionPaymentRecord,
    config: MeterConfig,
    validator: TokenValidator,
    wallet: Arc<dyn WalletBackend>,
    store: Box<dyn SessionStore>,
    recovery: RecoveryLogger,
}

impl SessionMeter {
    /// Create a meter for a new session and durably persist its record.
    pub fn new(
        session_id: impl Into<String>,
        token: Option<String>,
        config: MeterConfig,
        wallet: Arc<dyn WalletBackend>,
        store: Box<dyn SessionStore>,
        recovery: Box<dyn RecoveryLog>,
    ) -> MeterResult<Self> {
        let validator = TokenValidator::new(config.dev_mode);
        let record = SessionPaymentRecord::new(
            session_id,
            token,
            config.cost_per_operation,
            now_secs(),
        );

        let mut meter = Self {
            record,
            config,
            validator,
            wallet,
            store,
            recovery: RecoveryLogger::new(recovery),
        };
        meter.checkpoint()?;
        Ok(meter)
    }

    /// Reconstruct a meter from a persisted record (crash recovery, or a
    /// funding resume arriving days after suspension).
    ///
    /// The stored record keeps its own `cost_per_operation`; the config's
    /// price only applies to new sessions.
    pub fn resume_from_store(
        session_id: &str,
        config: MeterConfig,
        wallet: Arc<dyn WalletBackend>,
        store: Box<dyn SessionStore>,
        recovery: Box<dyn RecoveryLog>,
    ) -> MeterResult<Option<Self>> {
        let record = match store.get(session_id)? {
            Some(record) => record,
            None => return Ok(None),
        };

        let validator = TokenValidator::new(config.dev_mode);
        Ok(Some(Self {
            record,
            config,
            validator,
            wallet,
            store,
            recovery: RecoveryLogger::new(recovery),
        }))
    }

    /// The current payment record.
    pub fn record(&self) -> &SessionPaymentRecord {
        &self.record
    }

    /// The current payment status.
    pub fn status(&self) -> PaymentStatus {
        self.record.status
    }

    /// Charge one billable operation.
    ///
    /// Must be called before the operation executes: the deduction is
    /// committed to the store before this returns, so no operation can run
    /// without a corresponding deduction. `operation` is a label for the
    /// logs only.
    pub fn charge(&mut self, operation: &str) -> MeterResult<ChargeOutcome> {
        self.ensure_active()?;

        if !self.record.is_metered() {
            debug!(
                session_id = %self.record.session_id,
                operation,
                "unmetered session; no deduction"
            );
            return Ok(ChargeOutcome::Unmetered);
        }

        match self.record.deduct() {
            Some(balance) => {
                self.checkpoint()?;
                debug!(
                    session_id = %self.record.session_id,
                    operation,
                    cost = self.record.cost_per_operation,
                    balance,
                    spent = self.record.spent,
                    "operation charged"
                );
                Ok(ChargeOutcome::Charged { balance })
            }
            None => {
                self.record.status = PaymentStatus::Exhausted;
                let request = FundingRequest::new(
                    &self.record.session_id,
                    self.record.spent,
                    self.config.suggested_topup,
                );
                // Checkpoint before suspending: the resume may arrive after
                // an arbitrary delay, possibly to a different process.
                self.checkpoint()?;
                info!(
                    session_id = %self.record.session_id,
                    operation,
                    spent = self.record.spent,
                    balance = self.record.balance,
                    suggested = request.suggested_amount,
                    "balance exhausted; suspending for funding"
                );
                Ok(ChargeOutcome::Exhausted(request))
            }
        }
    }

    /// Answer a pending funding request.
    ///
    /// Re-entrant: a long session may exhaust and resume any number of
    /// times. An invalid top-up token leaves the session exhausted so the
    /// caller can retry or reject.
    pub fn resume(&mut self, payload: ResumePayload) -> MeterResult<ResumeOutcome> {
        if self.record.status != PaymentStatus::Exhausted {
            return Err(MeterError::InvalidTransition {
                from: self.record.status,
                action: "resume",
            });
        }

        match payload {
            ResumePayload::Reject => {
                info!(
                    session_id = %self.record.session_id,
                    "funding declined; terminating session"
                );
                // Nothing was ever redeemed, so the original token still
                // belongs to the payer.
                if let Some(original) = self.record.original_token.clone() {
                    self.record.refund_token = Some(original);
                }
                self.record.status = PaymentStatus::Error;
                self.checkpoint()?;
                Ok(ResumeOutcome::Terminated)
            }
            ResumePayload::Approve { token } | ResumePayload::Edit { token, .. } => {
                let validation = self.validator.validate(&token);
                if !validation.valid {
                    let reason = validation
                        .error
                        .unwrap_or_else(|| "invalid token".to_string());
                    warn!(
                        session_id = %self.record.session_id,
                        reason,
                        "top-up token rejected; session stays suspended"
                    );
                    return Err(MeterError::Validation { reason });
                }

                self.record.apply_topup(validation.amount, token);
                self.checkpoint()?;
                info!(
                    session_id = %self.record.session_id,
                    amount = validation.amount,
                    balance = self.record.balance,
                    "funding accepted; session resumed"
                );
                Ok(ResumeOutcome::Resumed {
                    balance: self.record.balance,
                })
            }
        }
    }

    /// Answer a funding request from raw JSON, rejecting unknown shapes
    /// with a typed error.
    pub fn resume_json(&mut self, value: &serde_json::Value) -> MeterResult<ResumeOutcome> {
        let payload = ResumePayload::parse(value)?;
        self.resume(payload)
    }

    /// Finalize a session whose work completed successfully.
    ///
    /// Redeems every held token (original plus top-ups) exactly once, then
    /// mints a refund for the remainder. A redemption fault is invisible to
    /// the user - their work succeeded - but lands the full token text in
    /// the recovery log. Idempotent: re-finalizing an already-finalized
    /// session returns the stored receipt without moving funds again.
    pub async fn finish(&mut self) -> MeterResult<SessionReceipt> {
        if self.record.is_finalized() {
            return Ok(self.receipt());
        }

        if self.record.spent == 0 {
            // Nothing was ever deducted (this also covers pending and
            // unmetered sessions): no redemption, and for a metered session
            // the original token - worth exactly the unspent remainder - is
            // the refund.
            self.record.refund_token = self.record.original_token.clone();
            self.record.status = PaymentStatus::Completed;
            self.checkpoint()?;
            return Ok(self.receipt());
        }

        // Work is confirmed complete: settle. Each token is presented once;
        // a wallet answering "already spent" is a retried finalize after a
        // crash, not a fault.
        let mut all_settled = true;
        for token in self.record.all_tokens() {
            match self.wallet.receive(&token).await {
                Ok(Redemption::Received(amount)) => {
                    info!(
                        session_id = %self.record.session_id,
                        amount,
                        "token redeemed to wallet"
                    );
                }
                Ok(Redemption::AlreadySpent) => {
                    info!(
                        session_id = %self.record.session_id,
                        "token already redeemed; benign duplicate"
                    );
                }
                Err(e) => {
                    warn!(
                        session_id = %self.record.session_id,
                        error = %e,
                        "redemption failed after successful work"
                    );
                    self.recovery
                        .log_unredeemed(&self.record.session_id, &token);
                    all_settled = false;
                }
            }
        }

        if all_settled && self.record.balance > 0 {
            self.record.refund_token = synthesize_refund(
                &self.wallet,
                self.record.balance,
                self.config.dev_mode,
            )
            .await;
        }

        self.record.status = PaymentStatus::Completed;
        self.checkpoint()?;
        Ok(self.receipt())
    }

    /// Finalize a session whose work failed.
    ///
    /// Never redeems: the payer keeps their funds. The original token is
    /// surfaced verbatim as the refund artifact, and every held token is
    /// logged. Idempotent like [`finish`](Self::finish).
    pub fn fail(&mut self, reason: &str) -> MeterResult<SessionReceipt> {
        if self.record.is_finalized() {
            return Ok(self.receipt());
        }

        warn!(
            session_id = %self.record.session_id,
            reason,
            "session failed; preserving payer funds"
        );

        if let Some(original) = self.record.original_token.clone() {
            self.record.refund_token = Some(original);
            for token in self.record.all_tokens() {
                self.recovery.log_returned(&self.record.session_id, &token);
            }
        }

        self.record.status = PaymentStatus::Error;
        self.checkpoint()?;
        Ok(self.receipt())
    }

    /// Mark the refund artifact as retrieved by the client.
    ///
    /// Returns the artifact. Safe to call again after a reconnect: an
    /// already-claimed refund is returned as-is.
    pub fn claim_refund(&mut self) -> MeterResult<Option<String>> {
        match self.record.status {
            PaymentStatus::Completed | PaymentStatus::Error => {
                if self.record.refund_token.is_some() {
                    self.record.refund_claimed = true;
                    self.record.status = PaymentStatus::Refunded;
                    self.checkpoint()?;
                }
                Ok(self.record.refund_token.clone())
            }
            PaymentStatus::Refunded => Ok(self.record.refund_token.clone()),
            other => Err(MeterError::InvalidTransition {
                from: other,
                action: "claim_refund",
            }),
        }
    }

    /// First-charge activation: validate the token or enter free mode.
    fn ensure_active(&mut self) -> MeterResult<()> {
        match self.record.status {
            PaymentStatus::Active => Ok(()),
            PaymentStatus::Pending => match self.record.original_token.clone() {
                Some(token) => {
                    let validation = self.validator.validate(&token);
                    if validation.valid {
                        self.record.activate(validation.amount);
                        self.checkpoint()?;
                        info!(
                            session_id = %self.record.session_id,
                            face_value = validation.amount,
                            "token validated; session active"
                        );
                        Ok(())
                    } else {
                        let reason = validation
                            .error
                            .unwrap_or_else(|| "invalid token".to_string());
                        self.record.status = PaymentStatus::Error;
                        self.checkpoint()?;
                        warn!(
                            session_id = %self.record.session_id,
                            reason,
                            "token validation failed; session terminated"
                        );
                        Err(MeterError::Validation { reason })
                    }
                }
                None => {
                    if self.config.allow_free_mode {
                        self.record.activate_free();
                        self.checkpoint()?;
                        info!(
                            session_id = %self.record.session_id,
                            "no token provided; running unmetered (free mode)"
                        );
                        Ok(())
                    } else {
                        self.record.status = PaymentStatus::Error;
                        self.checkpoint()?;
                        Err(MeterError::Validation {
                            reason: "no payment token provided".to_string(),
                        })
                    }
                }
            },
            other => Err(MeterError::InvalidTransition {
                from: other,
                action: "charge",
            }),
        }
    }

    /// Persist the record. Called after every mutation, before control
    /// returns to the caller.
    fn checkpoint(&mut self) -> MeterResult<()> {
        self.record.updated_at = now_secs();
        self.store.upsert(&self.record)?;
        Ok(())
    }

    fn receipt(&self) -> SessionReceipt {
        let returned_tokens = if self.record.status == PaymentStatus::Error {
            self.record.all_tokens()
        } else {
            Vec::new()
        };

        SessionReceipt {
            session_id: self.record.session_id.clone(),
            status: self.record.status,
            spent: self.record.spent,
            balance: self.record.balance,
            refund: self.record.refund_token.is_some(),
            refund_token: self.record.refund_token.clone(),
            returned_tokens,
        }
    }
}

impl std::fmt::Debug for SessionMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMeter")
            .field("session_id", &self.record.session_id)
            .field("status", &self.record.status)
            .field("balance", &self.record.balance)
            .field("spent", &self.record.spent)
            .finish()
    }
}
