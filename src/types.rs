//! Upstream payload types
//!
//! Type definitions for the block explorer (Etherscan-compatible) and the
//! exchange candlestick API. Proxy-module fields arrive as hex strings,
//! account-module fields as decimal strings.

use alloy_primitives::B256;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// One raw entry of the explorer's token transfer listing (`account/tokentx`).
///
/// The listing carries the gas data of the enclosing transaction, so a fee can
/// be computed without a separate receipt lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenTransfer {
    /// Transaction hash (hex string in JSON)
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Block number (decimal string in JSON)
    #[serde(rename = "blockNumber", deserialize_with = "deserialize_dec")]
    pub block_number: u64,

    /// Block timestamp in epoch seconds (decimal string in JSON)
    #[serde(rename = "timeStamp", deserialize_with = "deserialize_dec")]
    pub timestamp: u64,

    /// Gas price in wei (decimal string in JSON)
    #[serde(rename = "gasPrice", deserialize_with = "deserialize_dec")]
    pub gas_price: u128,

    /// Gas used by the transaction (decimal string in JSON)
    #[serde(rename = "gasUsed", deserialize_with = "deserialize_dec")]
    pub gas_used: u64,

    /// Token symbol of this leg, informational only
    #[serde(rename = "tokenSymbol", default)]
    pub token_symbol: Option<String>,
}

/// Transaction receipt as returned by `proxy/eth_getTransactionReceipt`.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    /// Effective gas price paid (hex string in JSON)
    #[serde(rename = "effectiveGasPrice", deserialize_with = "deserialize_hex_u128")]
    pub effective_gas_price: u128,

    /// Gas used (hex string in JSON)
    #[serde(rename = "gasUsed", deserialize_with = "deserialize_hex_u64")]
    pub gas_used: u64,

    /// Block the transaction was included in (hex string in JSON)
    #[serde(rename = "blockNumber", deserialize_with = "deserialize_hex_u64")]
    pub block_number: u64,
}

/// Block header subset from `proxy/eth_getBlockByNumber`.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    /// Block timestamp in epoch seconds (hex string in JSON)
    #[serde(rename = "timestamp", deserialize_with = "deserialize_hex_u64")]
    pub timestamp: u64,
}

/// Extract the authoritative leg of every logical transfer.
///
/// The explorer reports each swap through the watched pair contract as two
/// consecutive entries, one per token leg, both sharing the transaction hash
/// and gas data. Only the first entry of each pair is kept. A trailing
/// unpaired entry is kept as well.
pub fn authoritative_legs(raw: Vec<TokenTransfer>) -> Vec<TokenTransfer> {
    if raw.len() % 2 == 1 {
        tracing::debug!("Transfer page has an odd number of entries ({})", raw.len());
    }
    raw.into_iter().step_by(2).collect()
}

/// Opening price of a kline row.
///
/// Rows are `[open_time, "open", "high", "low", "close", ...]`; the open price
/// is a decimal string at index 1.
pub fn kline_open_price(row: &[Value]) -> Option<f64> {
    match row.get(1)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Parse a hex quantity (with or without 0x prefix) into a u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16)
}

// Hex deserialization helpers

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_hex_u64(&s).map_err(serde::de::Error::custom)
}

fn deserialize_hex_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u128::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

/// Deserialize a hex string to B256.
fn deserialize_hex_b256<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 32 {
        return Err(serde::de::Error::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Deserialize a decimal string into any integer type.
fn deserialize_dec<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let s = String::deserialize(deserializer)?;
    s.trim().parse::<T>().map_err(serde::de::Error::custom)
}
