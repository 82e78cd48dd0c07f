//! Metering state machine for streaming ecash micropayments.
//!
//! This crate is the heart of the payment core: it accepts a bearer token
//! at session start, meters billable operations against it, suspends for
//! funding when the balance runs out, and guarantees that redemption
//! happens if and only if the paid-for work actually completed.
//!
//! # Lifecycle
//!
//! ```text
//!            validate (no spend)          per operation
//! token ──▶ SessionMeter::new ──▶ charge() ──▶ Charged | Exhausted(request)
//!                                                 │            │
//!                                                 ▼            ▼ resume()
//!                                             finish()   Approve/Reject/Edit
//!                                                 │
//!                          redeem held tokens ◀───┴───▶ refund remainder
//! ```
//!
//! Failure at any point preserves the payer's funds: `fail()` never
//! redeems, and a redemption fault after successful work lands the full
//! token text in the durable recovery log instead of charging the user
//! twice or losing the money silently.
//!
//! The wallet, session store, and recovery log are injected; see
//! `satstream-wallet` and `satstream-store` for the production
//! implementations and `satstream-test-utils` for mocks.

pub mod config;
pub mod error;
pub mod meter;
pub mod recovery;

pub use config::MeterConfig;
pub use error::{MeterError, MeterResult};
pub use meter::{ChargeOutcome, ResumeOutcome, SessionMeter, SessionReceipt};
pub use recovery::{synthesize_refund, RecoveryLogger};

// Re-export the suspend/resume event types for runtime integrations.
pub use satstream_types::{FundingRequest, ResumePayload};
