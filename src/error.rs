//! Failure taxonomy of fee operations

use alloy_primitives::B256;
use thiserror::Error;

/// Errors surfaced by resolution, reconciliation and ingestion.
#[derive(Debug, Error)]
pub enum FeeError {
    /// Non-success response, malformed payload, network error or timeout
    /// from the block explorer or the exchange.
    #[error("upstream failure: {0:#}")]
    UpstreamFailure(anyhow::Error),

    /// No price is available for the inclusion time of a transaction.
    #[error("price unavailable at timestamp {timestamp}")]
    PriceUnavailable { timestamp: u64 },

    /// The explorer answered but does not know the transaction.
    #[error("transaction 0x{0:x} not found")]
    TransactionNotFound(B256),

    /// The fee store failed to read or write.
    #[error("store failure: {0:#}")]
    Store(anyhow::Error),
}

impl FeeError {
    pub fn upstream(err: anyhow::Error) -> Self {
        Self::UpstreamFailure(err)
    }

    pub fn store(err: anyhow::Error) -> Self {
        Self::Store(err)
    }

    /// Whether the ingestion loop should simply retry on its next tick.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamFailure(_) | Self::PriceUnavailable { .. })
    }
}
