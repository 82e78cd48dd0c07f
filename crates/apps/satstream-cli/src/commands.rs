//! Command implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use dialoguer::Confirm;

use satstream_meter::{ChargeOutcome, MeterConfig, ResumeOutcome, SessionMeter};
use satstream_store::{PaymentStore, RecoveryLog, StoreConfig};
use satstream_token::{debug_token, TokenValidator};
use satstream_types::{Amount, ResumePayload};
use satstream_wallet::{HttpWallet, MemoryWallet, WalletBackend};

/// Print the settled wallet balance.
pub async fn balance(wallet: &HttpWallet) -> anyhow::Result<()> {
    let balance = wallet.balance().await.context("querying wallet balance")?;
    println!("{} {} sats", "Balance:".bold(), balance);
    Ok(())
}

/// Sweep all funds into a single token and print it.
pub async fn sweep(wallet: &HttpWallet, yes: bool) -> anyhow::Result<()> {
    let balance = wallet.balance().await.context("querying wallet balance")?;
    if balance == 0 {
        println!("No funds to sweep.");
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Sweep {} sats? The printed token will be the ONLY copy of these funds",
                balance
            ))
            .default(false)
            .interact()
            .context("reading confirmation")?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    match wallet.sweep().await.context("sweeping wallet")? {
        Some(outcome) => {
            print_token_banner("SWEEP TOKEN - copy this to recover funds", &outcome.token);
            println!("Swept {} sats.", outcome.amount);
        }
        None => println!("No funds to sweep."),
    }
    Ok(())
}

/// Issue an exact-amount token and print it.
pub async fn send(wallet: &HttpWallet, amount: Amount) -> anyhow::Result<()> {
    let token = wallet
        .send(amount)
        .await
        .with_context(|| format!("issuing a {} sat token", amount))?;
    print_token_banner(&format!("SEND TOKEN ({} sats)", amount), &token);
    Ok(())
}

/// Redeem a token into the wallet.
pub async fn receive(wallet: &HttpWallet, token: &str) -> anyhow::Result<()> {
    use satstream_wallet::Redemption;

    match wallet.receive(token).await.context("redeeming token")? {
        Redemption::Received(amount) => {
            println!("{} {} sats", "Received:".green().bold(), amount);
        }
        Redemption::AlreadySpent => {
            println!("{}", "Token already spent.".yellow());
        }
    }
    Ok(())
}

/// Decode a token and show what it carries.
pub fn inspect(token: &str, dev: bool) -> anyhow::Result<()> {
    let validator = TokenValidator::new(dev);
    let validation = validator.validate(token);

    if !validation.valid {
        bail!(
            "invalid token: {}",
            validation.error.unwrap_or_else(|| "unknown".to_string())
        );
    }

    println!("{} {} sats", "Face value:".bold(), validation.amount);
    if let Ok(parsed) = satstream_token::parse(token) {
        if let Some(mint) = parsed.mint {
            println!("{} {}", "Mint:".bold(), mint);
        }
        if let Some(unit) = parsed.unit {
            println!("{} {}", "Unit:".bold(), unit);
        }
        println!("{} {}", "Proofs:".bold(), parsed.proofs.len());
    } else {
        println!("{}", "(debug token)".dimmed());
    }
    Ok(())
}

/// List the recovery log.
pub fn recovery(data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let base_dir = data_dir.unwrap_or_else(satstream_store::default_data_dir);
    let store =
        PaymentStore::open(StoreConfig::new(&base_dir)).context("opening payment store")?;

    let entries = store.recovery.entries().context("reading recovery log")?;
    if entries.is_empty() {
        println!("Recovery log is empty.");
        return Ok(());
    }

    for entry in entries {
        let when = chrono::DateTime::from_timestamp(entry.logged_at as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| entry.logged_at.to_string());
        let amount = entry
            .amount
            .map(|a| format!("{} sats", a))
            .unwrap_or_else(|| "unknown amount".to_string());

        println!(
            "{} [{}] session={} {} ({})",
            format!("#{}", entry.id).bold(),
            when,
            entry.session_id,
            entry.reason.to_string().red().bold(),
            amount
        );
        println!("  {}", entry.token);
    }
    Ok(())
}

/// Run a complete metered session locally: validate, meter, exhaust,
/// top up, finish, refund. Nothing leaves the process.
pub async fn simulate(amount: Amount, cost: Amount, operations: u32) -> anyhow::Result<()> {
    let wallet = MemoryWallet::new();
    let store = PaymentStore::open_in_memory().context("opening in-memory store")?;
    let config = MeterConfig::development()
        .with_cost_per_operation(cost)
        .with_suggested_topup(amount.max(cost));

    let token = debug_token(amount);
    println!("{} {}", "Token:".bold(), token);

    let mut meter = SessionMeter::new(
        "simulated-session",
        Some(token),
        config,
        Arc::new(wallet.clone()),
        Box::new(store.sessions),
        Box::new(store.recovery),
    )
    .context("creating session meter")?;

    for i in 1..=operations {
        match meter.charge(&format!("operation_{}", i))? {
            ChargeOutcome::Charged { balance } => {
                println!("op {:>3}: charged {} sats, balance {}", i, cost, balance);
            }
            ChargeOutcome::Unmetered => println!("op {:>3}: unmetered", i),
            ChargeOutcome::Exhausted(request) => {
                println!(
                    "op {:>3}: {} (spent {} sats); topping up {} sats",
                    i,
                    "exhausted".yellow().bold(),
                    request.spent_so_far,
                    request.suggested_amount
                );
                let outcome = meter.resume(ResumePayload::Approve {
                    token: debug_token(request.suggested_amount),
                })?;
                if let ResumeOutcome::Resumed { balance } = outcome {
                    println!("        resumed with balance {}", balance);
                }
                // Re-run the refused operation against the new balance.
                meter.charge(&format!("operation_{}", i))?;
            }
        }
    }

    let receipt = meter.finish().await.context("finalizing session")?;
    println!(
        "\n{}\n{}",
        "Receipt:".bold(),
        serde_json::to_string_pretty(&receipt)?
    );
    println!(
        "{} {} sats settled in wallet",
        "Settled:".green().bold(),
        wallet.current_balance()
    );
    Ok(())
}

fn print_token_banner(title: &str, token: &str) {
    let rule = "=".repeat(60);
    println!("\n{}", rule.yellow());
    println!("{}", title.yellow().bold());
    println!("{}", rule.yellow());
    println!("{}", token);
    println!("{}\n", rule.yellow());
}
