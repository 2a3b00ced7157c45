//! oraclefeed - oracle report and tip ingestion service
//!
//! Backfills `NewReport` and `TipAdded` logs from the chain, accepts webhook
//! deliveries of new ones and serves the retained window over HTTP.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oraclefeed_api::{logging::init_logging, server};
use oraclefeed_indexer::{
    config::Config,
    listener::{ChainBackfill, RpcProvider},
    EventStores,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "oraclefeed")]
#[command(version, about = "Oracle report and tip ingestion service", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "oraclefeed.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the service (backfill + HTTP server)
    Run,

    /// Run the configured backfill once and exit
    Backfill,

    /// Show how many records each store holds
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_file(&cli.config).context("Failed to load configuration")?;
    init_logging(&config.logging, cli.debug)?;

    info!("oraclefeed {} starting", env!("CARGO_PKG_VERSION"));
    info!("  RPC URL: {}", config.network.rpc_url);
    info!("  Oracle contract: {}", config.contracts.flex);
    info!("  Autopay contract: {}", config.contracts.autopay);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => server::run_with_config(config).await?,
        Commands::Backfill => backfill_once(&config).await?,
        Commands::Status => show_status(&config).await?,
    }

    Ok(())
}

async fn backfill_once(config: &Config) -> Result<()> {
    let stores = EventStores::open(&config.storage)
        .await
        .context("Failed to load event stores")?;
    let provider = RpcProvider::new(
        &config.network.rpc_url,
        config.contracts.flex,
        config.contracts.autopay,
    )?;

    let report = ChainBackfill::new(provider, stores, &config.backfill)
        .run()
        .await?;

    println!("Backfilled blocks {} to {}", report.from_block, report.to_block);
    for (name, stats) in [("NewReport", report.reports), ("TipAdded", report.tips)] {
        println!(
            "  {}: {} fetched, {} inserted, {} duplicates, {} rejected",
            name, stats.fetched, stats.inserted, stats.duplicates, stats.rejected
        );
    }

    Ok(())
}

async fn show_status(config: &Config) -> Result<()> {
    let stores = EventStores::open(&config.storage)
        .await
        .context("Failed to load event stores")?;

    println!("Store capacity: {}", config.storage.capacity);
    println!(
        "  {}: {} records",
        config.storage.new_report_path.display(),
        stores.reports().len().await
    );
    println!(
        "  {}: {} records",
        config.storage.tip_added_path.display(),
        stores.tips().len().await
    );

    Ok(())
}
