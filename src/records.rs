//! Record types for fee data
//!
//! `FeeRecord` is the persisted unit, serialized with postcard.
//! `FeeEntry` is the row reported for a reconciled transfer.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Persisted fee of one transaction.
///
/// Immutable once written: records are inserted, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    /// Transaction hash (primary key)
    pub transaction_id: B256,
    /// Inclusion time (Unix epoch seconds)
    pub timestamp: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Gas used
    pub gas_used: u64,
    /// Fee converted into the quote asset
    pub fee_quote: f64,
}

/// One reconciled transfer, as reported by range queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEntry {
    /// Transaction hash, 0x-prefixed lowercase hex
    pub hash: String,
    /// Inclusion time (Unix epoch seconds)
    pub timestamp: u64,
    /// Fee in the quote asset
    pub transaction_fee_usdt: f64,
}

impl FeeEntry {
    pub fn new(hash: B256, timestamp: u64, fee_quote: f64) -> Self {
        Self {
            hash: format_hash(hash),
            timestamp,
            transaction_fee_usdt: fee_quote,
        }
    }
}

impl From<&FeeRecord> for FeeEntry {
    fn from(record: &FeeRecord) -> Self {
        Self::new(record.transaction_id, record.timestamp, record.fee_quote)
    }
}

/// Format a hash as 0x-prefixed lowercase hex.
pub fn format_hash(hash: B256) -> String {
    format!("0x{:x}", hash)
}

/// Parse a 32-byte transaction hash (with or without 0x prefix).
pub fn parse_hash(s: &str) -> Result<B256, anyhow::Error> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| anyhow::anyhow!("Invalid hex hash {}: {}", s, e))?;
    if bytes.len() != 32 {
        anyhow::bail!("Hash must be 32 bytes (64 hex chars), got {} bytes", bytes.len());
    }
    Ok(B256::from_slice(&bytes))
}
