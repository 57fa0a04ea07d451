//! Block explorer client
//!
//! Typed access to an Etherscan-compatible HTTP API: receipts, block
//! timestamps, block-by-time lookup, the current head and token transfer pages.

use crate::types::{authoritative_legs, parse_hex_u64, Block, Receipt, TokenTransfer};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Explorer message for a `getblocknobytime` lookup past the chain head.
const NO_CLOSEST_BLOCK: &str = "No closest block found";

/// Read operations against on-chain data.
///
/// `Err` means the upstream call itself failed (transport error, timeout,
/// non-success status, malformed payload). `Ok(None)` means the upstream
/// answered but has no such object.
#[async_trait]
pub trait ChainData: Send + Sync {
    /// Gas data and inclusion block of a transaction.
    async fn receipt(&self, tx_hash: B256) -> Result<Option<Receipt>>;

    /// Timestamp (epoch seconds) of a block.
    async fn block_timestamp(&self, block: u64) -> Result<Option<u64>>;

    /// Earliest block whose timestamp is at or after `timestamp`.
    async fn first_block_at_or_after(&self, timestamp: u64) -> Result<Option<u64>>;

    /// Current chain head.
    async fn head_block(&self) -> Result<u64>;

    /// Authoritative transfer entries of `contract` from `start_block` onward,
    /// ascending by block. An empty page means the listing is exhausted.
    async fn transfer_page(
        &self,
        contract: Address,
        start_block: u64,
    ) -> Result<Vec<TokenTransfer>>;
}

/// HTTP client for an Etherscan-compatible explorer.
pub struct ExplorerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    /// Create a new explorer client whose calls are bounded by `timeout`.
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build explorer HTTP client")?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Make an explorer call and return the whole response body.
    async fn envelope(&self, params: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to send explorer request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Explorer returned HTTP {}", status);
        }

        response
            .json()
            .await
            .context("Failed to parse explorer response")
    }

    /// Make an explorer call and return its `result` field.
    async fn call(&self, params: &[(&str, String)]) -> Result<Value> {
        let json = self.envelope(params).await?;
        result_field(json)
    }
}

/// Extract `result` from an explorer response, surfacing explorer errors.
fn result_field(json: Value) -> Result<Value> {
    // Proxy module errors come back JSON-RPC style
    if let Some(error) = json.get("error") {
        anyhow::bail!("Explorer RPC error: {}", error);
    }

    let result = json
        .get("result")
        .cloned()
        .context("Explorer response missing 'result' field")?;

    // Account/block modules flag failures with status "0" and a string result.
    // An empty listing also has status "0" but an array result.
    if json.get("status").and_then(Value::as_str) == Some("0") && !result.is_array() {
        let message = json.get("message").and_then(Value::as_str).unwrap_or("NOTOK");
        anyhow::bail!("Explorer error: {} ({})", message, result);
    }

    Ok(result)
}

#[async_trait]
impl ChainData for ExplorerClient {
    async fn receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        let result = self
            .call(&[
                ("module", "proxy".to_string()),
                ("action", "eth_getTransactionReceipt".to_string()),
                ("txhash", format!("0x{:x}", tx_hash)),
            ])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let receipt = serde_json::from_value(result).context("Failed to deserialize receipt")?;
        Ok(Some(receipt))
    }

    async fn block_timestamp(&self, block: u64) -> Result<Option<u64>> {
        let result = self
            .call(&[
                ("module", "proxy".to_string()),
                ("action", "eth_getBlockByNumber".to_string()),
                ("tag", format!("0x{:x}", block)),
                ("boolean", "false".to_string()),
            ])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let block: Block =
            serde_json::from_value(result).context("Failed to deserialize block")?;
        Ok(Some(block.timestamp))
    }

    async fn first_block_at_or_after(&self, timestamp: u64) -> Result<Option<u64>> {
        let params = [
            ("module", "block".to_string()),
            ("action", "getblocknobytime".to_string()),
            ("timestamp", timestamp.to_string()),
            ("closest", "after".to_string()),
        ];
        let json = self.envelope(&params).await?;

        // A timestamp past the chain head has no block after it yet
        if json.get("status").and_then(Value::as_str) == Some("0")
            && json
                .get("result")
                .and_then(Value::as_str)
                .is_some_and(|r| r.contains(NO_CLOSEST_BLOCK))
        {
            debug!("No block at or after {} yet", timestamp);
            return Ok(None);
        }

        match result_field(json)? {
            Value::Null => Ok(None),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .with_context(|| format!("Invalid block number: {}", s)),
            Value::Number(n) => n.as_u64().map(Some).context("Invalid block number"),
            other => anyhow::bail!("Unexpected block number payload: {}", other),
        }
    }

    async fn head_block(&self) -> Result<u64> {
        let result = self
            .call(&[
                ("module", "proxy".to_string()),
                ("action", "eth_blockNumber".to_string()),
            ])
            .await?;
        let number_str = result
            .as_str()
            .context("Block number response is not a string")?;
        parse_hex_u64(number_str).context("Failed to parse block number")
    }

    async fn transfer_page(
        &self,
        contract: Address,
        start_block: u64,
    ) -> Result<Vec<TokenTransfer>> {
        let result = self
            .call(&[
                ("module", "account".to_string()),
                ("action", "tokentx".to_string()),
                ("address", format!("0x{:x}", contract)),
                ("startblock", start_block.to_string()),
                ("sort", "asc".to_string()),
            ])
            .await?;
        let raw: Vec<TokenTransfer> =
            serde_json::from_value(result).context("Failed to deserialize transfer page")?;
        debug!("Transfer page from block {}: {} raw entries", start_block, raw.len());
        Ok(authoritative_legs(raw))
    }
}
