//! Recovery logging and refund synthesis.

use std::sync::Arc;

use tracing::{error, warn};

use satstream_store::{RecoveryLog, RecoveryReason};
use satstream_token::{debug_token, encoded_amount};
use satstream_wallet::WalletBackend;
use satstream_types::Amount;

/// Writes tokens that need operator attention to the durable recovery log.
///
/// Every entry carries the FULL token text - a bearer instrument is only
/// recoverable from its complete text, so summaries or truncations are
/// useless. The same text is also emitted to the tracing stream so an
/// operator watching logs sees it immediately.
pub struct RecoveryLogger {
    log: Box<dyn RecoveryLog>,
}

impl RecoveryLogger {
    /// Create a logger over a durable recovery log.
    pub fn new(log: Box<dyn RecoveryLog>) -> Self {
        Self { log }
    }

    /// Record a token whose redemption failed after successful work.
    ///
    /// This is the loud path: the work is done, the user sees success, and
    /// only this record stands between the operator and lost funds.
    pub fn log_unredeemed(&mut self, session_id: &str, token: &str) {
        error!(
            session_id,
            token,
            "MANUAL RECOVERY NEEDED: work succeeded but token redemption failed; \
             redeem this token by hand"
        );
        self.append(session_id, RecoveryReason::RedemptionFailed, token);
    }

    /// Record a token returned to the payer after a work failure.
    ///
    /// Nothing was redeemed; the entry lets operators cross-check client
    /// recovery claims.
    pub fn log_returned(&mut self, session_id: &str, token: &str) {
        warn!(
            session_id,
            token, "work failed; token returned to payer unredeemed"
        );
        self.append(session_id, RecoveryReason::WorkFailed, token);
    }

    fn append(&mut self, session_id: &str, reason: RecoveryReason, token: &str) {
        let amount = encoded_amount(token);
        if let Err(e) = self
            .log
            .append(session_id, reason, token, amount, now_secs())
        {
            // The durable write failed; the tracing line above is now the
            // only copy of the token. Say so as loudly as possible.
            error!(
                session_id,
                token,
                error = %e,
                "failed to append to recovery log; the log line above is the only record"
            );
        }
    }
}

/// Mint a refund token for exactly `amount` via the wallet.
///
/// In development mode (or when the wallet holds the funds but cannot issue
/// a token right now), falls back to the deterministic debug encoding so the
/// amount is always recoverable from the artifact.
pub async fn synthesize_refund(
    wallet: &Arc<dyn WalletBackend>,
    amount: Amount,
    dev_mode: bool,
) -> Option<String> {
    if amount == 0 {
        return None;
    }

    match wallet.send(amount).await {
        Ok(token) => Some(token),
        Err(e) if dev_mode => {
            warn!(amount, error = %e, "wallet could not issue refund; using debug encoding");
            Some(debug_token(amount))
        }
        Err(e) => {
            // Hardened mode: surface the failure rather than fabricate value.
            error!(
                amount,
                error = %e,
                "failed to mint refund token; remainder stays in the wallet for \
                 manual refund"
            );
            None
        }
    }
}

/// Current Unix timestamp in seconds.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
