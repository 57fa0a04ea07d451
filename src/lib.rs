//! Gasfees - USD transaction fees for one token contract
//!
//! This library computes the fee paid by transactions touching a tracked
//! token contract, converts it into a quote currency at the historical
//! exchange price, and keeps the results in a persistent RocksDB store.

pub mod keys;
pub mod records;
pub mod store;
pub mod cli;

// Upstream adapters
pub mod cache;
pub mod config;
pub mod explorer;
pub mod price;
pub mod types;

// Fee operations
pub mod api;
pub mod error;
pub mod fee;
pub mod reconcile;
pub mod resolver;
pub mod watcher;

#[cfg(test)]
mod testutil;

// Re-export the main types for convenience
pub use error::FeeError;
pub use records::{FeeEntry, FeeRecord};
pub use resolver::FeeService;
pub use store::{FeeStore, RocksFeeStore};
