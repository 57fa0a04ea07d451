//! CLI implementation for feectl
//!
//! Provides a developer-friendly command-line interface over the fee store
//! and the fee operations. All commands output pretty JSON.

use crate::api::parse_datetime;
use crate::config::Config;
use crate::explorer::ExplorerClient;
use crate::price::BinanceClient;
use crate::records::{format_hash, parse_hash, FeeEntry};
use crate::resolver::FeeService;
use crate::{FeeStore, RocksFeeStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Transaction fee CLI tool
#[derive(Parser)]
#[command(name = "feectl")]
#[command(about = "Transaction fee store CLI tool")]
pub struct Cli {
    /// Path to the RocksDB database directory
    #[arg(short, long, default_value = "./fee_db")]
    db_path: PathBuf,

    /// Path to the JSON config file (needed by resolve and reconcile)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get a stored fee record without touching upstream APIs
    Get {
        /// Transaction hash (hex, with or without 0x prefix)
        hash: String,
    },
    /// Count stored fee records
    Count,
    /// Resolve the fee of a transaction, computing and storing it if missing
    Resolve {
        /// Transaction hash (hex, with or without 0x prefix)
        hash: String,
    },
    /// Compute and store fees for every transfer in a time window
    Reconcile {
        /// Window start (ISO 8601, UTC if no offset, or epoch seconds)
        start: String,
        /// Window end, inclusive
        end: String,
    },
}

/// Wire the fee service from the config file and an opened store.
fn build_service(config_path: &Path, store: Arc<RocksFeeStore>) -> Result<FeeService> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
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
    Ok(FeeService::new(
        store,
        Arc::new(chain),
        Arc::new(oracle),
        config.contract()?,
    ))
}

/// Run the CLI command and print JSON output.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = Arc::new(
        RocksFeeStore::open(&cli.db_path)
            .with_context(|| format!("Failed to open database at {:?}", cli.db_path))?,
    );

    let result: Value = match cli.command {
        Commands::Get { hash } => {
            let tx = parse_hash(&hash)?;
            match store.get_fee(tx)? {
                Some(record) => json!({
                    "hash": format_hash(tx),
                    "record": {
                        "timestamp": record.timestamp,
                        "gas_price": record.gas_price.to_string(),
                        "gas_used": record.gas_used,
                        "transaction_fee_usdt": record.fee_quote,
                    }
                }),
                None => json!({ "hash": format_hash(tx), "record": null }),
            }
        }
        Commands::Count => {
            json!({ "records": store.count_fees()? })
        }
        Commands::Resolve { hash } => {
            let tx = parse_hash(&hash)?;
            let service = build_service(&cli.config, store)?;
            let record = service.resolve_record(tx).await?;
            serde_json::to_value(FeeEntry::from(&record))?
        }
        Commands::Reconcile { start, end } => {
            let start = parse_datetime(&start).context("Invalid start")?;
            let end = parse_datetime(&end).context("Invalid end")?;
            let service = build_service(&cli.config, store)?;
            let result = service.reconcile(start, end).await?;
            json!({
                "complete": result.is_complete(),
                "interruption": result.interruption,
                "inserted": result.inserted,
                "transactions": result.entries,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
