//! Metering configuration.

use serde::{Deserialize, Serialize};

use satstream_types::constants::{DEFAULT_COST_PER_OPERATION, DEFAULT_SUGGESTED_TOPUP};
use satstream_types::Amount;

/// Configuration for a session meter.
///
/// These are the only knobs the payment core exposes: the unit price, the
/// suggested top-up, and two explicitly-audited escape hatches for
/// development (debug tokens, unmetered sessions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Satoshis deducted per billable operation.
    pub cost_per_operation: Amount,

    /// Suggested amount in funding requests.
    pub suggested_topup: Amount,

    /// Accept `cashu_debug_<n>` tokens. Must never be set in a hardened
    /// deployment.
    pub dev_mode: bool,

    /// Allow sessions without a token to run unmetered. Off by default:
    /// enabling unmetered sessions is a deliberate configuration choice,
    /// not a silent fallback.
    pub allow_free_mode: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            cost_per_operation: DEFAULT_COST_PER_OPERATION,
            suggested_topup: DEFAULT_SUGGESTED_TOPUP,
            dev_mode: false,
            allow_free_mode: false,
        }
    }
}

impl MeterConfig {
    /// Development preset: debug tokens and free mode enabled.
    pub fn development() -> Self {
        Self {
            dev_mode: true,
            allow_free_mode: true,
            ..Self::default()
        }
    }

    /// Set the cost per billable operation.
    pub fn with_cost_per_operation(mut self, cost: Amount) -> Self {
        self.cost_per_operation = cost;
        self
    }

    /// Set the suggested top-up amount.
    pub fn with_suggested_topup(mut self, amount: Amount) -> Self {
        self.suggested_topup = amount;
        self
    }
}
