//! Single-transaction fee resolution
//!
//! The store is consulted first; on a miss the fee is rebuilt from the
//! transaction receipt, the inclusion block timestamp and a historical price,
//! then persisted.

use crate::error::FeeError;
use crate::explorer::ChainData;
use crate::fee::price_fee;
use crate::price::PriceOracle;
use crate::records::FeeRecord;
use crate::store::FeeStore;
use alloy_primitives::{Address, B256};
use std::sync::Arc;
use tracing::{debug, info};

/// Fee operations over one tracked contract.
///
/// Cheap to share: all collaborators are reference counted.
#[derive(Clone)]
pub struct FeeService {
    pub(crate) store: Arc<dyn FeeStore>,
    pub(crate) chain: Arc<dyn ChainData>,
    pub(crate) oracle: Arc<dyn PriceOracle>,
    pub(crate) contract: Address,
}

impl FeeService {
    pub fn new(
        store: Arc<dyn FeeStore>,
        chain: Arc<dyn ChainData>,
        oracle: Arc<dyn PriceOracle>,
        contract: Address,
    ) -> Self {
        Self {
            store,
            chain,
            oracle,
            contract,
        }
    }

    pub fn store(&self) -> &dyn FeeStore {
        self.store.as_ref()
    }

    /// Fee of a transaction in the quote asset.
    pub async fn resolve(&self, tx_hash: B256) -> Result<f64, FeeError> {
        self.resolve_record(tx_hash).await.map(|r| r.fee_quote)
    }

    /// Fee record of a transaction, computing and persisting it on a miss.
    pub async fn resolve_record(&self, tx_hash: B256) -> Result<FeeRecord, FeeError> {
        if let Some(record) = self.store.get_fee(tx_hash).map_err(FeeError::store)? {
            debug!("Fee cache hit for 0x{:x}", tx_hash);
            return Ok(record);
        }

        let receipt = self
            .chain
            .receipt(tx_hash)
            .await
            .map_err(|e| FeeError::upstream(e.context("Failed to fetch receipt")))?
            .ok_or(FeeError::TransactionNotFound(tx_hash))?;

        let timestamp = self
            .chain
            .block_timestamp(receipt.block_number)
            .await
            .map_err(|e| FeeError::upstream(e.context("Failed to fetch block timestamp")))?
            .ok_or_else(|| {
                FeeError::upstream(anyhow::anyhow!(
                    "Block {} of 0x{:x} not found",
                    receipt.block_number,
                    tx_hash
                ))
            })?;

        let record = price_fee(
            self.oracle.as_ref(),
            tx_hash,
            timestamp,
            receipt.effective_gas_price,
            receipt.gas_used,
        )
        .await?;

        if self.store.put_fee(&record).map_err(FeeError::store)? {
            info!(
                "Stored fee for 0x{:x}: {:.4} (block {}, ts {})",
                tx_hash, record.fee_quote, receipt.block_number, timestamp
            );
            return Ok(record);
        }

        // A concurrent writer got there first; the stored record is authoritative
        self.store
            .get_fee(tx_hash)
            .map_err(FeeError::store)?
            .ok_or_else(|| FeeError::store(anyhow::anyhow!("Fee record 0x{:x} vanished", tx_hash)))
    }
}
