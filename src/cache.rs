//! Minute-bar price cache
//!
//! In-memory cache to avoid repeated exchange calls for the same minute bar.
//! Historical opening prices never change, so entries are kept for the
//! lifetime of the process, bounded by a fixed capacity.

use std::collections::HashMap;

/// Default number of minute bars kept in memory.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Cache of opening prices keyed by minute (epoch seconds / 60).
pub struct PriceCache {
    prices: HashMap<u64, f64>,
    capacity: usize,
}

impl PriceCache {
    /// Create a new empty cache.
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: HashMap::new(),
            capacity,
        }
    }

    /// Look up the opening price of a minute bar.
    pub fn get(&self, minute: u64) -> Option<f64> {
        self.prices.get(&minute).copied()
    }

    /// Remember the opening price of a minute bar.
    ///
    /// When full, the cache is cleared before inserting.
    pub fn insert(&mut self, minute: u64, price: f64) {
        if self.prices.len() >= self.capacity && !self.prices.contains_key(&minute) {
            self.prices.clear();
        }
        self.prices.insert(minute, price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
