//! Shared test utilities for Satstream crates.
//!
//! Provides a configurable [`MockWallet`] implementing the `WalletBackend`
//! trait, plus helpers for building real-format tokens in tests.

pub mod helpers;
pub mod mock_wallet;

pub use helpers::real_token;
pub use mock_wallet::MockWallet;
