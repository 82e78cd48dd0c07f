//! Mock implementation of the `WalletBackend` trait for testing.
//!
//! Tracks receives, sends, and sweeps in memory and returns configurable
//! results, including a wallet-offline mode for exercising the
//! redemption-fault path.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use satstream_token::{debug_token, TokenValidator};
use satstream_types::Amount;
use satstream_wallet::{Redemption, SweepOutcome, WalletBackend, WalletError, WalletResult};

struct MockWalletInner {
    /// Settled balance.
    balance: Amount,
    /// Every token successfully received, in order.
    received: Vec<String>,
    /// Tokens the wallet considers already spent.
    spent: HashSet<String>,
    /// Amounts debited by send calls.
    sent: Vec<Amount>,
    /// When true, all operations fail with a (retryable) network error.
    offline: bool,
}

/// A mock implementation of the `WalletBackend` trait for testing.
///
/// Tracks all operations in memory and returns configurable results.
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and
/// all clones share the same state.
#[derive(Clone)]
pub struct MockWallet {
    validator: TokenValidator,
    inner: Arc<RwLock<MockWalletInner>>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    /// Create an empty mock wallet.
    pub fn new() -> Self {
        Self {
            validator: TokenValidator::development(),
            inner: Arc::new(RwLock::new(MockWalletInner {
                balance: 0,
                received: Vec::new(),
                spent: HashSet::new(),
                sent: Vec::new(),
                offline: false,
            })),
        }
    }

    /// Create a wallet holding an initial settled balance.
    pub fn with_balance(balance: Amount) -> Self {
        let mock = Self::new();
        mock.inner.write().unwrap().balance = balance;
        mock
    }

    /// Configure the mock to fail all operations with a network error.
    pub fn offline() -> Self {
        let mock = Self::new();
        mock.inner.write().unwrap().offline = true;
        mock
    }

    /// Toggle the offline mode at runtime.
    pub fn set_offline(&self, offline: bool) {
        self.inner.write().unwrap().offline = offline;
    }

    /// Pre-mark a token as spent, so receiving it reports a duplicate.
    pub fn mark_spent(&self, token: &str) {
        self.inner.write().unwrap().spent.insert(token.to_string());
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// Every token received, in order.
    pub fn receives(&self) -> Vec<String> {
        self.inner.read().unwrap().received.clone()
    }

    /// Number of successful receives.
    pub fn receive_count(&self) -> usize {
        self.inner.read().unwrap().received.len()
    }

    /// Amounts debited by send calls.
    pub fn sends(&self) -> Vec<Amount> {
        self.inner.read().unwrap().sent.clone()
    }

    /// Current settled balance.
    pub fn current_balance(&self) -> Amount {
        self.inner.read().unwrap().balance
    }

    fn check_online(inner: &MockWalletInner) -> WalletResult<()> {
        if inner.offline {
            Err(WalletError::network("mock wallet offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WalletBackend for MockWallet {
    async fn receive(&self, token: &str) -> WalletResult<Redemption> {
        let validation = self.validator.validate(token);

        let mut inner = self
            .inner
            .write()
            .map_err(|_| WalletError::internal("mock lock poisoned"))?;
        Self::check_online(&inner)?;

        if !validation.valid {
            return Err(WalletError::rejected(
                validation.error.unwrap_or_else(|| "invalid token".to_string()),
            ));
        }
        if !inner.spent.insert(token.to_string()) {
            return Ok(Redemption::AlreadySpent);
        }

        inner.balance += validation.amount;
        inner.received.push(token.to_string());
        Ok(Redemption::Received(validation.amount))
    }

    async fn balance(&self) -> WalletResult<Amount> {
        let inner = self
            .inner
            .read()
            .map_err(|_| WalletError::internal("mock lock poisoned"))?;
        Self::check_online(&inner)?;
        Ok(inner.balance)
    }

    async fn sweep(&self) -> WalletResult<Option<SweepOutcome>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| WalletError::internal("mock lock poisoned"))?;
        Self::check_online(&inner)?;

        if inner.balance == 0 {
            return Ok(None);
        }
        let amount = inner.balance;
        inner.balance = 0;
        Ok(Some(SweepOutcome {
            amount,
            token: debug_token(amount),
        }))
    }

    async fn send(&self, amount: Amount) -> WalletResult<String> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| WalletError::internal("mock lock poisoned"))?;
        Self::check_online(&inner)?;

        if inner.balance < amount {
            return Err(WalletError::InsufficientBalance {
                have: inner.balance,
                need: amount,
            });
        }
        inner.balance -= amount;
        inner.sent.push(amount);
        Ok(debug_token(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_tracks_tokens() {
        let mock = MockWallet::new();
        mock.receive("cashu_debug_100").await.unwrap();
        mock.receive("cashu_debug_50").await.unwrap();

        assert_eq!(mock.receive_count(), 2);
        assert_eq!(mock.current_balance(), 150);
        assert_eq!(mock.receives(), vec!["cashu_debug_100", "cashu_debug_50"]);
    }

    #[tokio::test]
    async fn test_offline_fails_with_retryable_error() {
        let mock = MockWallet::offline();
        let result = mock.receive("cashu_debug_100").await;
        match result {
            Err(e) => assert!(e.is_retryable()),
            Ok(_) => panic!("offline wallet should fail"),
        }

        // Back online: the receive now succeeds.
        mock.set_offline(false);
        assert!(mock.receive("cashu_debug_100").await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_spent_reports_duplicate() {
        let mock = MockWallet::new();
        mock.mark_spent("cashu_debug_100");

        let result = mock.receive("cashu_debug_100").await.unwrap();
        assert_eq!(result, Redemption::AlreadySpent);
        assert_eq!(mock.receive_count(), 0);
    }

    #[tokio::test]
    async fn test_send_and_sweep() {
        let mock = MockWallet::with_balance(100);
        mock.send(30).await.unwrap();
        assert_eq!(mock.sends(), vec![30]);

        let outcome = mock.sweep().await.unwrap().unwrap();
        assert_eq!(outcome.amount, 70);
        assert_eq!(mock.current_balance(), 0);
    }
}
