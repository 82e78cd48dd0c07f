//! Wallet backend trait definition.

use async_trait::async_trait;

use satstream_types::Amount;

use crate::error::WalletResult;

/// Outcome of presenting a token for redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// The proofs were accepted; the amount is now settled balance.
    Received(Amount),
    /// The wallet already holds these proofs. Treated as a benign duplicate:
    /// a retried redemption after a crash lands here.
    AlreadySpent,
}

/// A sweep's result: everything the wallet held, as one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Amount contained in the token.
    pub amount: Amount,
    /// The sweep token, in full.
    pub token: String,
}

/// Trait for the hot-wallet collaborator.
///
/// This trait abstracts the settlement layer, allowing for:
/// - The HTTP client against walletd for production
/// - An in-memory wallet for development
/// - A mock implementation for testing
///
/// All methods are async and return `WalletResult`.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Present a token for redemption, converting it into settled balance.
    ///
    /// Called exactly once per original token per session lifecycle, and
    /// only after the corresponding billable work succeeded.
    async fn receive(&self, token: &str) -> WalletResult<Redemption>;

    /// Get the settled balance across all redeemed tokens.
    async fn balance(&self) -> WalletResult<Amount>;

    /// Sweep all settled funds into a single token.
    ///
    /// Returns `None` when the wallet is empty. This removes the funds from
    /// the wallet — the returned token is the only copy.
    async fn sweep(&self) -> WalletResult<Option<SweepOutcome>>;

    /// Create a token for exactly `amount`, debiting the settled balance.
    ///
    /// Used to mint refund tokens for session remainders.
    async fn send(&self, amount: Amount) -> WalletResult<String>;
}
