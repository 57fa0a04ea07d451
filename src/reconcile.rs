//! Range reconciliation
//!
//! Walks the explorer's transfer listing for the tracked contract over a time
//! window, reuses stored fees, prices the missing ones from the gas data
//! embedded in each transfer and persists them in one atomic batch.

use crate::error::FeeError;
use crate::fee::price_fee;
use crate::records::{FeeEntry, FeeRecord};
use crate::resolver::FeeService;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Result of a range reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// One entry per transaction, in upstream order (ascending block).
    pub entries: Vec<FeeEntry>,
    /// Records newly written to the store.
    pub inserted: usize,
    /// Set when an upstream failure cut the scan short; `entries` is then partial.
    pub interruption: Option<String>,
}

impl Reconciliation {
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

/// Outcome of one pass over the transfer listing.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub entries: Vec<FeeEntry>,
    /// Newly priced records, not yet persisted.
    pub staged: Vec<FeeRecord>,
    /// One past the highest block consumed, if any entry was consumed.
    pub next_block: Option<u64>,
    pub interruption: Option<FeeError>,
}

/// Epoch-second bounds of a window; the end bound includes the whole end second.
pub fn window_bounds(start: DateTime<Utc>, end: DateTime<Utc>) -> (u64, u64) {
    let start_epoch = start.timestamp().max(0) as u64;
    let end_epoch = end.timestamp().max(0) as u64 + 1;
    (start_epoch, end_epoch)
}

impl FeeService {
    /// Fees of every transfer of the tracked contract between `start` and `end`.
    ///
    /// Upstream failures end the scan early and yield a partial result; an
    /// unavailable price or a store failure aborts the whole operation
    /// without persisting anything.
    pub async fn reconcile(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Reconciliation, FeeError> {
        let (start_epoch, end_epoch) = window_bounds(start, end);
        self.reconcile_epochs(start_epoch, end_epoch).await
    }

    /// Same as [`FeeService::reconcile`] over raw epoch-second bounds, both inclusive.
    pub async fn reconcile_epochs(
        &self,
        start_epoch: u64,
        end_epoch: u64,
    ) -> Result<Reconciliation, FeeError> {
        if start_epoch > end_epoch {
            return Ok(Reconciliation::default());
        }

        let start_block = match self.chain.first_block_at_or_after(start_epoch).await {
            Ok(Some(block)) => block,
            Ok(None) => {
                debug!("No block at or after {}", start_epoch);
                return Ok(Reconciliation::default());
            }
            Err(e) => {
                warn!("Failed to find first block after {}: {:#}", start_epoch, e);
                return Ok(Reconciliation {
                    interruption: Some(format!("{:#}", e)),
                    ..Default::default()
                });
            }
        };

        info!(
            "Reconciling window [{}, {}] from block {}",
            start_epoch, end_epoch, start_block
        );
        let scan = self.scan(start_block, Some(end_epoch)).await?;

        let inserted = if scan.staged.is_empty() {
            0
        } else {
            self.store
                .put_fees(&scan.staged)
                .map_err(FeeError::store)?
        };

        info!(
            "Reconciled {} transfers ({} newly stored{})",
            scan.entries.len(),
            inserted,
            if scan.interruption.is_some() { ", partial" } else { "" }
        );

        Ok(Reconciliation {
            entries: scan.entries,
            inserted,
            interruption: scan.interruption.map(|e| e.to_string()),
        })
    }

    /// Page through the transfer listing from `start_block`.
    ///
    /// Stops at the first transfer later than `end_epoch` (if given), on an
    /// empty page, or when the cursor stops advancing. Upstream failures stop
    /// the scan and are reported in [`Scan::interruption`]; an unavailable
    /// price or store failure is returned as an error.
    pub(crate) async fn scan(
        &self,
        start_block: u64,
        end_epoch: Option<u64>,
    ) -> Result<Scan, FeeError> {
        let mut scan = Scan::default();
        let mut seen = HashSet::new();
        let mut cursor = start_block;

        'pages: loop {
            let page = match self.chain.transfer_page(self.contract, cursor).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Failed to fetch transfer page from block {}: {:#}", cursor, e);
                    scan.interruption = Some(FeeError::upstream(e));
                    break;
                }
            };
            if page.is_empty() {
                debug!("Transfer listing exhausted at block {}", cursor);
                break;
            }

            let page_start = cursor;
            for transfer in page {
                if end_epoch.is_some_and(|end| transfer.timestamp > end) {
                    break 'pages;
                }

                // Repeats of a hash carry the same gas data; the first occurrence stands
                if seen.insert(transfer.hash) {
                    let fee_quote = match self
                        .store
                        .get_fee(transfer.hash)
                        .map_err(FeeError::store)?
                    {
                        Some(record) => record.fee_quote,
                        None => {
                            let priced = price_fee(
                                self.oracle.as_ref(),
                                transfer.hash,
                                transfer.timestamp,
                                transfer.gas_price,
                                transfer.gas_used,
                            )
                            .await;
                            let record = match priced {
                                Ok(record) => record,
                                Err(e @ FeeError::UpstreamFailure(_)) => {
                                    warn!("Price lookup failed, stopping scan: {}", e);
                                    scan.interruption = Some(e);
                                    break 'pages;
                                }
                                Err(e) => return Err(e),
                            };
                            let fee_quote = record.fee_quote;
                            scan.staged.push(record);
                            fee_quote
                        }
                    };
                    scan.entries.push(FeeEntry::new(transfer.hash, transfer.timestamp, fee_quote));
                }

                cursor = transfer.block_number + 1;
                scan.next_block = Some(cursor);
            }

            if cursor <= page_start {
                warn!("Transfer cursor did not advance past block {}", page_start);
                break;
            }
        }

        Ok(scan)
    }
}
