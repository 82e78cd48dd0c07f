//! satstream - operator CLI for the Satstream payment core.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satstream_wallet::HttpWallet;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Balance => {
            let wallet = HttpWallet::new(&cli.wallet_url)?;
            commands::balance(&wallet).await
        }
        Commands::Sweep { yes } => {
            let wallet = HttpWallet::new(&cli.wallet_url)?;
            commands::sweep(&wallet, yes).await
        }
        Commands::Send { amount } => {
            let wallet = HttpWallet::new(&cli.wallet_url)?;
            commands::send(&wallet, amount).await
        }
        Commands::Receive { token } => {
            let wallet = HttpWallet::new(&cli.wallet_url)?;
            commands::receive(&wallet, &token).await
        }
        Commands::Inspect { token, dev } => commands::inspect(&token, dev),
        Commands::Recovery => commands::recovery(cli.data_dir),
        Commands::Simulate {
            amount,
            cost,
            operations,
        } => commands::simulate(amount, cost, operations).await,
    }
}
