//! Fee service binary
//!
//! Serves the fee API and runs the incremental ingestion loop for the
//! configured token contract.

use anyhow::{Context, Result};
use clap::Parser;
use gasfees::api;
use gasfees::config::Config;
use gasfees::explorer::ExplorerClient;
use gasfees::price::BinanceClient;
use gasfees::resolver::FeeService;
use gasfees::store::RocksFeeStore;
use gasfees::watcher::Watcher;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Transaction fee service
#[derive(Parser)]
#[command(name = "feed")]
#[command(about = "Serve transaction fees and ingest new transfers")]
struct Args {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Path to RocksDB database directory
    #[arg(short, long, default_value = "./fee_db")]
    db_path: PathBuf,

    /// Address the HTTP API listens on
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    let contract = config.contract()?;

    info!("Starting fee service");
    info!("Contract: 0x{:x}", contract);
    info!("Explorer: {}", config.etherscan_base_url);
    info!("Database: {:?}", args.db_path);

    // Open fee store
    let store = RocksFeeStore::open(&args.db_path)
        .with_context(|| format!("Failed to open database at {:?}", args.db_path))?;

    let chain = ExplorerClient::new(
        config.etherscan_base_url.clone(),
        config.etherscan_api_key.clone(),
        config.http_timeout(),
    )?;
    let oracle = BinanceClient::new(
        &config.binance_base_url,
        config.price_symbol.clone(),
        config.http_timeout(),
    )?;

    let service = FeeService::new(Arc::new(store), Arc::new(chain), Arc::new(oracle), contract);
    let mut watcher = Watcher::new(service.clone(), config.poll_interval());

    // Handle Ctrl+C gracefully
    tokio::select! {
        result = api::serve(args.bind, service) => {
            result.context("API server error")?;
        }
        _ = watcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    info!("Fee service stopped");
    Ok(())
}
