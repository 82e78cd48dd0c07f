//! HTTP client for the walletd wire contract.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use satstream_types::Amount;

use crate::error::{WalletError, WalletResult};
use crate::retry::RetryPolicy;
use crate::traits::{Redemption, SweepOutcome, WalletBackend};
use crate::types::{
    BalanceResponse, ReceiveRequest, ReceiveResponse, SendRequest, SendResponse, SweepResponse,
};

/// Default HTTP timeout for wallet requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin HTTP client against the wallet service.
#[derive(Clone)]
pub struct HttpWallet {
    /// HTTP client
    client: Client,
    /// Base URL of the wallet API (e.g. `http://127.0.0.1:8350/api/wallet`)
    base_url: String,
    /// Retry policy for transient faults
    retry: RetryPolicy,
}

impl HttpWallet {
    /// Create a new wallet client.
    pub fn new(base_url: &str) -> WalletResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| WalletError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the wallet API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Map a non-success HTTP status to a wallet error.
    ///
    /// Server-side faults are retryable; client-side rejections are not.
    fn status_error(status: reqwest::StatusCode, body: String) -> WalletError {
        if status.is_server_error() {
            WalletError::network(format!("wallet returned {}: {}", status, body))
        } else {
            WalletError::rejected(format!("wallet returned {}: {}", status, body))
        }
    }
}

#[async_trait::async_trait]
impl WalletBackend for HttpWallet {
    async fn receive(&self, token: &str) -> WalletResult<Redemption> {
        let url = format!("{}/receive", self.base_url);
        let request = ReceiveRequest {
            token: token.to_string(),
        };

        let response: ReceiveResponse = self
            .retry
            .execute(|| {
                let client = self.client.clone();
                let url = url.clone();
                let request = request.clone();
                async move {
                    debug!(url = %url, "Presenting token to wallet");
                    let response = client.post(&url).json(&request).send().await?;

                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        return Err(Self::status_error(status, body));
                    }

                    response
                        .json::<ReceiveResponse>()
                        .await
                        .map_err(|e| WalletError::protocol(format!("bad receive response: {}", e)))
                }
            })
            .await?;

        if response.success {
            info!(amount = response.amount, "Token redeemed to wallet");
            return Ok(Redemption::Received(response.amount));
        }

        let reason = response.error.unwrap_or_else(|| "unknown".to_string());
        if reason.to_lowercase().contains("already spent") {
            // Benign duplicate: a retried redemption after a crash.
            warn!("Wallet reports token already spent; treating as duplicate");
            Ok(Redemption::AlreadySpent)
        } else {
            Err(WalletError::rejected(reason))
        }
    }

    async fn balance(&self) -> WalletResult<Amount> {
        let url = format!("{}/balance", self.base_url);

        let response: BalanceResponse = self
            .retry
            .execute(|| {
                let client = self.client.clone();
                let url = url.clone();
                async move {
                    let response = client.get(&url).send().await?;

                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        return Err(Self::status_error(status, body));
                    }

                    response
                        .json::<BalanceResponse>()
                        .await
                        .map_err(|e| WalletError::protocol(format!("bad balance response: {}", e)))
                }
            })
            .await?;

        Ok(response.balance)
    }

    async fn sweep(&self) -> WalletResult<Option<SweepOutcome>> {
        let url = format!("{}/sweep", self.base_url);

        // No retry: sweep is destructive, a blind replay could race a
        // concurrent operator action.
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let response: SweepResponse = response
            .json()
            .await
            .map_err(|e| WalletError::protocol(format!("bad sweep response: {}", e)))?;

        match (response.success, response.token) {
            (true, Some(token)) => Ok(Some(SweepOutcome {
                amount: response.amount,
                token,
            })),
            (true, None) => Err(WalletError::protocol("sweep succeeded without a token")),
            (false, _) => {
                let reason = response.error.unwrap_or_else(|| "unknown".to_string());
                if reason.to_lowercase().contains("no funds") {
                    Ok(None)
                } else {
                    Err(WalletError::rejected(reason))
                }
            }
        }
    }

    async fn send(&self, amount: Amount) -> WalletResult<String> {
        let url = format!("{}/send", self.base_url);
        let request = SendRequest { amount };

        // No retry for the same reason as sweep: each success debits funds.
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, body));
        }

        let response: SendResponse = response
            .json()
            .await
            .map_err(|e| WalletError::protocol(format!("bad send response: {}", e)))?;

        match (response.success, response.token) {
            (true, Some(token)) => {
                info!(amount, "Wallet issued send token");
                Ok(token)
            }
            (true, None) => Err(WalletError::protocol("send succeeded without a token")),
            (false, _) => Err(WalletError::rejected(
                response.error.unwrap_or_else(|| "unknown".to_string()),
            )),
        }
    }
}

impl std::fmt::Debug for HttpWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWallet")
            .field("base_url", &self.base_url)
            .finish()
    }
}
