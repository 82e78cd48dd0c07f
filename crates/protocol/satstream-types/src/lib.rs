//! Data structures for the Satstream payment protocol.
//!
//! This crate provides the data types shared across the payment core. It
//! contains no I/O and no wallet logic, only type definitions with
//! serialization support and the small amount of arithmetic needed to keep
//! the session record internally consistent.
//!
//! # Module Organization
//!
//! - [`constants`] - Protocol constants (pricing defaults, token prefixes)
//! - [`status`] - The session payment status enumeration
//! - [`record`] - The per-session payment record and its mutators
//! - [`funding`] - Funding-interrupt payloads (suspend/resume events)
//!
//! # Type Conventions
//!
//! - All amounts are [`Amount`] (`u64`, satoshis). No floating point is used
//!   anywhere in fund arithmetic.
//! - Types derive `Debug`, `Clone`, `PartialEq` and serde traits with
//!   `#[serde(rename_all = "snake_case")]` for consistent JSON.
//! - Enums persisted to storage use `#[repr(u8)]` with a `from_u8`
//!   constructor.

/// Protocol version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod constants;
pub mod funding;
pub mod record;
pub mod status;

/// Amount in satoshis (smallest currency unit).
pub type Amount = u64;

pub use funding::{FundingError, FundingRequest, ResumePayload};
pub use record::SessionPaymentRecord;
pub use status::PaymentStatus;
