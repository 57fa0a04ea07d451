//! Incremental ingestion loop
//!
//! Periodically fetches transfers of the tracked contract newer than an
//! in-memory block cursor, prices the ones not yet stored and persists them.
//! The cursor starts at the chain head, so only transfers from startup on
//! are ingested; older ones are filled on demand by reconciliation.

use crate::error::FeeError;
use crate::resolver::FeeService;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What one polling cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Block the cycle scanned from.
    pub from_block: u64,
    /// Distinct transactions seen.
    pub transfers: usize,
    /// Records newly written to the store.
    pub inserted: usize,
    /// Cursor after the cycle.
    pub cursor: u64,
}

/// Polling ingester for one contract.
///
/// Ticks never overlap: the loop awaits each cycle before the next interval.
pub struct Watcher {
    service: FeeService,
    interval: Duration,
    cursor: Option<u64>,
}

impl Watcher {
    pub fn new(service: FeeService, interval: Duration) -> Self {
        Self {
            service,
            interval,
            cursor: None,
        }
    }

    /// Start from an explicit block instead of the chain head.
    pub fn with_cursor(mut self, block: u64) -> Self {
        self.cursor = Some(block);
        self
    }

    /// Next block to scan, once known.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Set the cursor to the current chain head if it is not set yet.
    pub async fn initialize(&mut self) -> Result<u64, FeeError> {
        if let Some(cursor) = self.cursor {
            return Ok(cursor);
        }
        let head = self
            .service
            .chain
            .head_block()
            .await
            .map_err(|e| FeeError::upstream(e.context("Failed to fetch head block")))?;
        info!("Ingestion cursor initialized at block {}", head);
        self.cursor = Some(head);
        Ok(head)
    }

    /// Run one polling cycle.
    ///
    /// On any error nothing is persisted and the cursor is left where it was,
    /// so the next cycle retries the same range.
    pub async fn tick(&mut self) -> Result<TickSummary, FeeError> {
        let from_block = self.initialize().await?;

        let scan = self.service.scan(from_block, None).await?;
        if let Some(e) = scan.interruption {
            return Err(e);
        }

        let inserted = if scan.staged.is_empty() {
            0
        } else {
            self.service
                .store
                .put_fees(&scan.staged)
                .map_err(FeeError::store)?
        };

        let cursor = scan.next_block.unwrap_or(from_block);
        self.cursor = Some(cursor);

        Ok(TickSummary {
            from_block,
            transfers: scan.entries.len(),
            inserted,
            cursor,
        })
    }

    /// Poll forever, logging failed cycles.
    pub async fn run(&mut self) {
        info!("Starting ingestion loop (every {:?})", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.tick().await {
                Ok(summary) if summary.transfers > 0 => info!(
                    "Ingested blocks {}..{}: {} transfers, {} new fees",
                    summary.from_block, summary.cursor, summary.transfers, summary.inserted
                ),
                Ok(summary) => debug!("No new transfers from block {}", summary.from_block),
                Err(e) if e.is_retryable() => warn!("Ingestion cycle failed, will retry: {}", e),
                Err(e) => error!("Ingestion cycle failed: {}", e),
            }
        }
    }
}
