//! Configuration loading
//!
//! Reads upstream endpoints and credentials from a JSON file. Every key can be
//! overridden by an environment variable of the same name.
//!
//! # Example file format:
//! ```json
//! {
//!   "ETHERSCAN_API_KEY": "YOURKEY",
//!   "WETH_USDT_CONTRACT_ADDRESS": "0x0d4a11d5EEaaC28EC3F61d100daF4d40471f1852",
//!   "ETHERSCAN_BASE_URL": "https://api.etherscan.io/api",
//!   "BINANCE_BASE_URL": "https://api.binance.com/api/v3/"
//! }
//! ```

use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "ETHERSCAN_API_KEY", default)]
    pub etherscan_api_key: String,

    /// Token pair contract whose transfers are tracked
    #[serde(rename = "WETH_USDT_CONTRACT_ADDRESS", default)]
    pub contract_address: String,

    #[serde(rename = "ETHERSCAN_BASE_URL", default)]
    pub etherscan_base_url: String,

    /// Exchange REST base; `klines` is appended
    #[serde(rename = "BINANCE_BASE_URL", default)]
    pub binance_base_url: String,

    /// Trading pair used for base -> quote conversion
    #[serde(rename = "PRICE_SYMBOL", default = "default_symbol")]
    pub price_symbol: String,

    /// Ingestion loop interval
    #[serde(rename = "POLL_INTERVAL_SECS", default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Bound on every upstream HTTP call
    #[serde(rename = "HTTP_TIMEOUT_SECS", default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_symbol() -> String {
    "ETHUSDT".to_string()
}

fn default_poll_interval() -> u64 {
    40
}

fn default_http_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a JSON file, apply environment overrides and validate.
    ///
    /// A missing file is not an error on its own: all keys may come from the
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file: {:?}", path))?
        } else {
            serde_json::from_str("{}").context("Failed to build default config")?
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("ETHERSCAN_API_KEY") {
            self.etherscan_api_key = v;
        }
        if let Some(v) = lookup("WETH_USDT_CONTRACT_ADDRESS") {
            self.contract_address = v;
        }
        if let Some(v) = lookup("ETHERSCAN_BASE_URL") {
            self.etherscan_base_url = v;
        }
        if let Some(v) = lookup("BINANCE_BASE_URL") {
            self.binance_base_url = v;
        }
        if let Some(v) = lookup("PRICE_SYMBOL") {
            self.price_symbol = v;
        }
        if let Some(v) = lookup("POLL_INTERVAL_SECS") {
            self.poll_interval_secs = v
                .parse()
                .with_context(|| format!("Invalid POLL_INTERVAL_SECS: {}", v))?;
        }
        if let Some(v) = lookup("HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = v
                .parse()
                .with_context(|| format!("Invalid HTTP_TIMEOUT_SECS: {}", v))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("ETHERSCAN_API_KEY", &self.etherscan_api_key),
            ("WETH_USDT_CONTRACT_ADDRESS", &self.contract_address),
            ("ETHERSCAN_BASE_URL", &self.etherscan_base_url),
            ("BINANCE_BASE_URL", &self.binance_base_url),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Missing required configuration key {}", key);
            }
        }
        parse_address(&self.contract_address)
            .context("Invalid WETH_USDT_CONTRACT_ADDRESS")?;
        if self.poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be greater than zero");
        }
        Ok(())
    }

    /// Tracked contract address.
    pub fn contract(&self) -> Result<Address> {
        parse_address(&self.contract_address)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s)
        .with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!("Address must be 20 bytes (40 hex chars), got {} bytes", bytes.len());
    }

    Ok(Address::from_slice(&bytes))
}
