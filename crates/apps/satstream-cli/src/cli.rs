//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use satstream_types::constants::DEFAULT_WALLET_URL;
use satstream_types::Amount;

/// Satstream payment CLI.
#[derive(Parser, Debug)]
#[command(name = "satstream")]
#[command(author = "Satstream Contributors")]
#[command(version)]
#[command(about = "Operator CLI for the Satstream payment core")]
#[command(
    long_about = "Administer the Satstream hot wallet (balance, sweep, send, receive),\n\
                  inspect tokens, review the recovery log, and simulate a metered session."
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Wallet service API base URL.
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_WALLET_URL,
        env = "SATSTREAM_WALLET_URL"
    )]
    pub wallet_url: String,

    /// Data directory (recovery log, session records).
    #[arg(long, global = true, env = "SATSTREAM_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // =========================================================================
    // Wallet Administration
    // =========================================================================
    /// Show the settled wallet balance.
    Balance,

    /// Sweep all wallet funds into a single token.
    ///
    /// WARNING: the printed token becomes the only copy of the funds.
    Sweep {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Issue a token for an exact amount.
    Send {
        /// Amount in satoshis.
        amount: Amount,
    },

    /// Redeem a token into the wallet.
    Receive {
        /// The full token text.
        token: String,
    },

    // =========================================================================
    // Diagnostics
    // =========================================================================
    /// Decode a token and show its face value without spending it.
    Inspect {
        /// The full token text.
        token: String,

        /// Accept debug tokens (development mode).
        #[arg(long)]
        dev: bool,
    },

    /// List recovery-log entries (unredeemed and returned tokens).
    Recovery,

    /// Run a complete metered session locally against an in-memory wallet.
    Simulate {
        /// Face value of the simulated payment token.
        #[arg(long, default_value = "100")]
        amount: Amount,

        /// Cost per billable operation.
        #[arg(long, default_value = "10")]
        cost: Amount,

        /// Number of billable operations to run.
        #[arg(long, default_value = "5")]
        operations: u32,
    },
}
