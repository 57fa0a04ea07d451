//! In-memory upstream fakes shared by unit tests.

use crate::explorer::ChainData;
use crate::price::PriceOracle;
use crate::resolver::FeeService;
use crate::store::RocksFeeStore;
use crate::types::{authoritative_legs, Receipt, TokenTransfer};
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Pair contract used by fixtures.
pub fn contract() -> Address {
    Address::from([0x0d; 20])
}

/// Explorer fake. Every transfer is stored as two raw legs, like the real listing.
pub struct FakeChain {
    raw_transfers: Mutex<Vec<TokenTransfer>>,
    receipts: HashMap<B256, Receipt>,
    blocks: HashMap<u64, u64>,
    head: AtomicU64,
    /// Raw entries per page
    page_size: usize,
    /// Page calls served before every further page call fails
    page_budget: Option<usize>,
    fail: AtomicBool,
    pub receipt_calls: AtomicUsize,
    pub block_calls: AtomicUsize,
    pub first_block_calls: AtomicUsize,
    pub head_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self {
            raw_transfers: Mutex::new(Vec::new()),
            receipts: HashMap::new(),
            blocks: HashMap::new(),
            head: AtomicU64::new(0),
            page_size: 10_000,
            page_budget: None,
            fail: AtomicBool::new(false),
            receipt_calls: AtomicUsize::new(0),
            block_calls: AtomicUsize::new(0),
            first_block_calls: AtomicUsize::new(0),
            head_calls: AtomicUsize::new(0),
            page_calls: AtomicUsize::new(0),
        }
    }
}

fn leg(
    hash: B256,
    block: u64,
    timestamp: u64,
    gas_price: u128,
    gas_used: u64,
    symbol: &str,
) -> TokenTransfer {
    TokenTransfer {
        hash,
        block_number: block,
        timestamp,
        gas_price,
        gas_used,
        token_symbol: Some(symbol.to_string()),
    }
}

impl FakeChain {
    pub fn with_receipt(mut self, hash: B256, block: u64, gas_price: u128, gas_used: u64) -> Self {
        self.receipts.insert(
            hash,
            Receipt {
                effective_gas_price: gas_price,
                gas_used,
                block_number: block,
            },
        );
        self
    }

    pub fn with_block(mut self, block: u64, timestamp: u64) -> Self {
        self.blocks.insert(block, timestamp);
        self
    }

    pub fn with_transfer(self, hash: B256, block: u64, timestamp: u64) -> Self {
        self.push_transfer(hash, block, timestamp);
        self
    }

    pub fn with_head(self, head: u64) -> Self {
        self.head.store(head, Ordering::SeqCst);
        self
    }

    pub fn with_page_size(mut self, raw_entries: usize) -> Self {
        self.page_size = raw_entries;
        self
    }

    /// Serve `pages` transfer pages, then fail every page call.
    pub fn failing_after_pages(mut self, pages: usize) -> Self {
        self.page_budget = Some(pages);
        self
    }

    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Append a transfer (both legs) with fixed gas data: 40 gwei * 100_000 gas.
    pub fn push_transfer(&self, hash: B256, block: u64, timestamp: u64) {
        let mut raw = self.raw_transfers.lock().unwrap();
        raw.push(leg(hash, block, timestamp, 40_000_000_000, 100_000, "WETH"));
        raw.push(leg(hash, block, timestamp, 40_000_000_000, 100_000, "USDT"));
        raw.sort_by_key(|t| t.block_number);
    }

    pub fn total_calls(&self) -> usize {
        self.receipt_calls.load(Ordering::SeqCst)
            + self.block_calls.load(Ordering::SeqCst)
            + self.first_block_calls.load(Ordering::SeqCst)
            + self.head_calls.load(Ordering::SeqCst)
            + self.page_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("Explorer returned HTTP 503 Service Unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ChainData for FakeChain {
    async fn receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.receipts.get(&tx_hash).cloned())
    }

    async fn block_timestamp(&self, block: u64) -> Result<Option<u64>> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.blocks.get(&block).copied())
    }

    async fn first_block_at_or_after(&self, timestamp: u64) -> Result<Option<u64>> {
        self.first_block_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let raw = self.raw_transfers.lock().unwrap();
        let from_transfers = raw
            .iter()
            .filter(|t| t.timestamp >= timestamp)
            .map(|t| t.block_number);
        let from_blocks = self
            .blocks
            .iter()
            .filter(|(_, ts)| **ts >= timestamp)
            .map(|(b, _)| *b);
        // Nothing at or after the timestamp means it is past the head
        Ok(from_transfers.chain(from_blocks).min())
    }

    async fn head_block(&self) -> Result<u64> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn transfer_page(
        &self,
        _contract: Address,
        start_block: u64,
    ) -> Result<Vec<TokenTransfer>> {
        let served = self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if self.page_budget.is_some_and(|budget| served >= budget) {
            anyhow::bail!("Explorer returned HTTP 503 Service Unavailable");
        }
        let page: Vec<TokenTransfer> = self
            .raw_transfers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.block_number >= start_block)
            .take(self.page_size)
            .cloned()
            .collect();
        Ok(authoritative_legs(page))
    }
}

/// Exchange fake with a fixed (or missing) price.
pub struct FakeOracle {
    price: Mutex<Option<f64>>,
    /// Conversions answered before every further one is a transport error
    answer_budget: Option<usize>,
    calls: AtomicUsize,
    last_timestamp: Mutex<Option<u64>>,
}

impl FakeOracle {
    pub fn price(price: f64) -> Self {
        Self {
            price: Mutex::new(Some(price)),
            answer_budget: None,
            calls: AtomicUsize::new(0),
            last_timestamp: Mutex::new(None),
        }
    }

    pub fn unavailable() -> Self {
        let oracle = Self::price(0.0);
        oracle.set_price(None);
        oracle
    }

    /// Answer `conversions` calls, then fail every call like a dropped connection.
    pub fn failing_after(mut self, conversions: usize) -> Self {
        self.answer_budget = Some(conversions);
        self
    }

    pub fn set_price(&self, price: Option<f64>) {
        *self.price.lock().unwrap() = price;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        *self.last_timestamp.lock().unwrap()
    }
}

#[async_trait]
impl PriceOracle for FakeOracle {
    async fn convert(&self, amount: f64, timestamp: u64) -> Result<Option<f64>> {
        let answered = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.answer_budget.is_some_and(|budget| answered >= budget) {
            anyhow::bail!("Exchange request timed out");
        }
        *self.last_timestamp.lock().unwrap() = Some(timestamp);
        let price = *self.price.lock().unwrap();
        Ok(price.map(|p| amount * p))
    }
}

/// Fee service over a fresh RocksDB store and the given fakes.
pub fn fixture_service(
    chain: FakeChain,
    oracle: FakeOracle,
) -> (FeeService, Arc<FakeChain>, Arc<FakeOracle>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksFeeStore::open(dir.path()).unwrap());
    let chain = Arc::new(chain);
    let oracle = Arc::new(oracle);
    let service = FeeService::new(store, chain.clone(), oracle.clone(), contract());
    (service, chain, oracle, dir)
}

/// Hash whose bytes are all `byte`.
pub fn hash(byte: u8) -> B256 {
    B256::from([byte; 32])
}
