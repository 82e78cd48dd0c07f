//! satstream-walletd - the Satstream hot-wallet service.
//!
//! Manages the ecash proofs received from metered agent sessions:
//! - `POST /api/wallet/receive` - redeem a token into the ledger
//! - `GET  /api/wallet/balance` - settled balance
//! - `POST /api/wallet/sweep`   - move everything into one token
//! - `POST /api/wallet/send`    - issue an exact-amount token
//!
//! # Quick Start
//!
//! ```bash
//! # Start with defaults (127.0.0.1:8350, ~/.satstream/wallet.db)
//! satstream-walletd
//!
//! # Custom bind address and data directory
//! satstream-walletd --host 0.0.0.0 --port 9000 --data-dir /var/lib/satstream
//! ```

mod api;
mod ledger;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::ledger::Ledger;

/// Satstream hot-wallet service.
#[derive(Parser, Debug)]
#[command(
    name = "satstream-walletd",
    about = "Hot-wallet HTTP service for Satstream ecash payments",
    version
)]
struct Args {
    /// Host to bind to.
    #[arg(long, default_value = "127.0.0.1", env = "SATSTREAM_WALLET_HOST")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value = "8350", env = "SATSTREAM_WALLET_PORT")]
    port: u16,

    /// Data directory for the ledger database.
    #[arg(long, env = "SATSTREAM_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Mint URL recorded on issued tokens.
    #[arg(
        long,
        default_value = "https://mint.minibits.cash/Bitcoin",
        env = "MINT_URL"
    )]
    mint_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let data_dir = args.data_dir.unwrap_or_else(satstream_store::default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let db_path = data_dir.join("wallet.db");

    tracing::info!(db = %db_path.display(), mint = %args.mint_url, "Starting walletd");

    // Fail fast on a broken ledger: better to refuse to start than to
    // accept tokens we cannot store.
    let ledger = Ledger::open(&db_path, &args.mint_url)
        .with_context(|| format!("opening ledger at {}", db_path.display()))?;

    let balance = ledger.balance().context("reading opening balance")?;
    tracing::info!(balance, "Opening balance");
    if balance > 0 {
        println!(
            "\n{}\n{} {} sats held in {}\n{}\n",
            "============================================================".yellow(),
            "Residual funds:".yellow().bold(),
            balance,
            db_path.display(),
            "Sweep them with: satstream sweep".yellow()
        );
    }

    let state = Arc::new(AppState {
        ledger: Arc::new(ledger),
    });
    let app = api::router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(addr = %addr, "Wallet API listening");

    axum::serve(listener, app).await.context("serving wallet API")?;
    Ok(())
}
