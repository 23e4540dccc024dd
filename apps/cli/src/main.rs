//! RewardCraft CLI
//!
//! Command-line interface for checking and claiming Merkle-distributed
//! rewards.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use rewardcraft_client::{RewardsSession, Snapshot};
use rewardcraft_core::{encode_address, encode_hash, format_token_amount};
use rewardcraft_engine::format_countdown;
use rewardcraft_logging::LogLevel;
use rewardcraft_settings::{default_settings_path, Settings};
use rewardcraft_settlement::SettlementClient;
use rewardcraft_store::HttpRootSource;

/// RewardCraft - Merkle reward reconciliation
#[derive(Parser)]
#[command(name = "rewardcraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explicit log level, overrides -v
    #[arg(long)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show claimable and pending rewards
    Status {
        /// Claimant address (defaults to rewards.claimant)
        #[arg(short, long)]
        address: Option<String>,

        /// Print the reconciliation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Claim everything claimable under the published root
    Claim {
        /// Claimant address (defaults to rewards.claimant)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Show the estimated time until the next root publication
    Countdown {
        /// Claimant address (defaults to rewards.claimant)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Show or edit settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Print the settings file path
    Path,
    /// Set a value, e.g. `config set chain.rpc_url https://…`
    Set { key: String, value: String },
}

type Session = RewardsSession<HttpRootSource, SettlementClient>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .unwrap_or_else(|| LogLevel::from_verbosity(cli.verbose));
    rewardcraft_logging::try_init(level).map_err(|e| anyhow::anyhow!(e))?;

    let path = cli.config.clone().unwrap_or_else(default_settings_path);
    let settings = Settings::load_from(&path)
        .with_context(|| format!("loading settings from {}", path.display()))?;

    match cli.command {
        Commands::Status { address, json } => {
            let session = open_session(&settings, address.as_deref())?;
            status(&session, &settings, json).await?;
        }
        Commands::Claim { address } => {
            let session = open_session(&settings, address.as_deref())?;
            claim(&session, &settings).await?;
        }
        Commands::Countdown { address } => {
            let session = open_session(&settings, address.as_deref())?;
            countdown(&session).await?;
        }
        Commands::Config { action } => {
            config(settings, action)?;
        }
    }

    Ok(())
}

fn open_session(settings: &Settings, address: Option<&str>) -> Result<Session> {
    let session_config = settings
        .session_config(address)
        .context("incomplete rewards settings")?;
    let settlement_config = settings
        .settlement_config()
        .context("incomplete chain settings")?;

    let source = HttpRootSource::with_timeout(
        session_config.merkle_base_url.clone(),
        Duration::from_secs(settings.chain.http_timeout_secs),
    )?;
    let chain = SettlementClient::new(settlement_config);
    if chain.is_mock() {
        warn!("Chain mode is mock; on-chain state is simulated");
    }

    Ok(RewardsSession::new(session_config, source, Arc::new(chain)))
}

async fn refresh(session: &Session) -> Result<Snapshot> {
    session
        .refresh()
        .await
        .context("could not check rewards")
}

fn print_snapshot(snapshot: &Snapshot, settings: &Settings) {
    let token = &settings.token;
    let amount = |value, digits| format_token_amount(value, token.decimals, digits);
    let result = &snapshot.result;

    println!("RewardCraft Status");
    println!("==================");
    println!("Claimant:          {}", encode_address(&result.address));
    match result.onchain_root {
        Some(root) => println!("Published root:    {}", encode_hash(&root)),
        None => println!("Published root:    (none)"),
    }
    println!("Latest root:       {}", encode_hash(&result.latest_root));
    println!(
        "Latest root total: {} {}",
        amount(result.latest_root_total, None),
        token.symbol
    );
    println!(
        "Claimable:         {} {}",
        amount(result.claimable_amount, Some(2)),
        token.symbol
    );
    println!(
        "Pending:           {} {}",
        amount(result.unclaimable_amount, Some(2)),
        token.symbol
    );
    if let Some(remaining) = snapshot.countdown {
        println!("Next publication:  {}", format_countdown(remaining));
    }
}

async fn status(session: &Session, settings: &Settings, json: bool) -> Result<()> {
    let snapshot = refresh(session).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.result)?);
    } else {
        print_snapshot(&snapshot, settings);
    }
    Ok(())
}

async fn claim(session: &Session, settings: &Settings) -> Result<()> {
    let snapshot = refresh(session).await?;
    print_snapshot(&snapshot, settings);

    if snapshot.result.claimable_amount == 0 {
        bail!("nothing to claim");
    }

    let mut handle = session.claim(&snapshot)?;
    println!("\nClaim submitted, waiting for confirmation (Ctrl-C to stop waiting)...");

    let outcome = tokio::select! {
        outcome = handle.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => {
            handle.cancel();
            handle.outcome().await
        }
    };

    let tx = outcome.context("claim failed")?;
    let tx_hex = encode_hash(&tx);
    info!("Claim confirmed in {}", tx_hex);
    println!("Claim confirmed: {}", tx_hex);
    if let Some(link) = settings.rewards.tx_link(&tx_hex) {
        println!("View transaction: {}", link);
    }
    Ok(())
}

async fn countdown(session: &Session) -> Result<()> {
    let snapshot = refresh(session).await?;
    match snapshot.countdown {
        Some(remaining) => println!("{}", format_countdown(remaining)),
        None if snapshot.result.has_pending() => println!("No publication time recorded"),
        None => println!("No pending rewards"),
    }
    Ok(())
}

fn config(mut settings: Settings, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        ConfigAction::Path => {
            println!("{}", settings.config_path().display());
        }
        ConfigAction::Set { key, value } => {
            settings.set(&key, &value)?;
            settings.save()?;
            println!("{} = {}", key, value);
        }
    }
    Ok(())
}
