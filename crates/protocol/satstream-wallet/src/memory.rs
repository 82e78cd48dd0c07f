//! In-memory wallet backend for development.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use satstream_token::{debug_token, TokenValidator};
use satstream_types::Amount;

use crate::error::{WalletError, WalletResult};
use crate::traits::{Redemption, SweepOutcome, WalletBackend};

struct MemoryWalletInner {
    /// Settled balance.
    balance: Amount,
    /// Full text of every token received, for double-spend detection.
    received: HashSet<String>,
}

/// A wallet that settles entirely in memory.
///
/// Used by development runs and the CLI `simulate` command so the full
/// payment lifecycle can be exercised without a wallet service or real
/// currency. Accepts both real-format and debug tokens; issued tokens use
/// the debug encoding so the amount is always recoverable from the artifact.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct MemoryWallet {
    validator: TokenValidator,
    inner: Arc<Mutex<MemoryWalletInner>>,
}

impl MemoryWallet {
    /// Create an empty development wallet.
    pub fn new() -> Self {
        Self {
            validator: TokenValidator::development(),
            inner: Arc::new(Mutex::new(MemoryWalletInner {
                balance: 0,
                received: HashSet::new(),
            })),
        }
    }

    /// Create a wallet holding an initial balance.
    pub fn with_balance(balance: Amount) -> Self {
        let wallet = Self::new();
        wallet.inner.lock().expect("wallet lock").balance = balance;
        wallet
    }

    /// Current settled balance (synchronous accessor for assertions).
    pub fn current_balance(&self) -> Amount {
        self.inner.lock().expect("wallet lock").balance
    }

    /// Number of distinct tokens received.
    pub fn receive_count(&self) -> usize {
        self.inner.lock().expect("wallet lock").received.len()
    }
}

impl Default for MemoryWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletBackend for MemoryWallet {
    async fn receive(&self, token: &str) -> WalletResult<Redemption> {
        let validation = self.validator.validate(token);
        if !validation.valid {
            return Err(WalletError::rejected(
                validation.error.unwrap_or_else(|| "invalid token".to_string()),
            ));
        }

        let mut inner = self
            .inner
            .lock()
            .map_err(|_| WalletError::internal("wallet lock poisoned"))?;
        if !inner.received.insert(token.to_string()) {
            return Ok(Redemption::AlreadySpent);
        }
        inner.balance += validation.amount;
        Ok(Redemption::Received(validation.amount))
    }

    async fn balance(&self) -> WalletResult<Amount> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| WalletError::internal("wallet lock poisoned"))?;
        Ok(inner.balance)
    }

    async fn sweep(&self) -> WalletResult<Option<SweepOutcome>> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| WalletError::internal("wallet lock poisoned"))?;
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
            .lock()
            .map_err(|_| WalletError::internal("wallet lock poisoned"))?;
        if inner.balance < amount {
            return Err(WalletError::InsufficientBalance {
                have: inner.balance,
                need: amount,
            });
        }
        inner.balance -= amount;
        Ok(debug_token(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satstream_token::encoded_amount;

    #[tokio::test]
    async fn test_receive_credits_balance() {
        let wallet = MemoryWallet::new();
        let result = wallet.receive("cashu_debug_100").await.unwrap();
        assert_eq!(result, Redemption::Received(100));
        assert_eq!(wallet.balance().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_double_receive_is_already_spent() {
        let wallet = MemoryWallet::new();
        wallet.receive("cashu_debug_100").await.unwrap();

        let result = wallet.receive("cashu_debug_100").await.unwrap();
        assert_eq!(result, Redemption::AlreadySpent);
        // Balance unchanged by the duplicate.
        assert_eq!(wallet.balance().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_receive_rejects_garbage() {
        let wallet = MemoryWallet::new();
        let result = wallet.receive("notcashu123").await;
        assert!(matches!(result, Err(WalletError::Rejected { .. })));
        assert_eq!(wallet.balance().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_debits_and_encodes_amount() {
        let wallet = MemoryWallet::with_balance(100);
        let token = wallet.send(40).await.unwrap();
        assert_eq!(encoded_amount(&token), Some(40));
        assert_eq!(wallet.balance().await.unwrap(), 60);
    }

    #[tokio::test]
    async fn test_send_insufficient_balance() {
        let wallet = MemoryWallet::with_balance(10);
        let result = wallet.send(40).await;
        assert!(matches!(
            result,
            Err(WalletError::InsufficientBalance { have: 10, need: 40 })
        ));
    }

    #[tokio::test]
    async fn test_sweep_drains_everything() {
        let wallet = MemoryWallet::with_balance(75);
        let outcome = wallet.sweep().await.unwrap().unwrap();
        assert_eq!(outcome.amount, 75);
        assert_eq!(encoded_amount(&outcome.token), Some(75));
        assert_eq!(wallet.balance().await.unwrap(), 0);

        // Nothing left to sweep.
        assert!(wallet.sweep().await.unwrap().is_none());
    }
}
