//! FeeStore trait and RocksDB implementation
//!
//! Durable mapping from transaction hash to its computed fee record.
//! Records are immutable: writes are insert-if-absent and never overwrite.

use crate::keys::{decode_fee_key, encode_fee_key};
use crate::records::FeeRecord;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Mutex;

/// Trait defining the interface for fee record storage.
///
/// Implementations must make check-then-insert safe under concurrent
/// writers: the store, not the caller, is the source of truth for dedup.
pub trait FeeStore: Send + Sync {
    /// Get a fee record by transaction hash.
    fn get_fee(&self, tx_hash: B256) -> Result<Option<FeeRecord>>;

    /// Insert one record.
    ///
    /// Returns `false` if a record with the same hash already exists, in
    /// which case the stored record is left untouched.
    fn put_fee(&self, record: &FeeRecord) -> Result<bool>;

    /// Insert many records in one atomic batch.
    ///
    /// Either every new record is written or none is. Records whose hash is
    /// already stored are skipped. Returns the number of records written.
    fn put_fees(&self, records: &[FeeRecord]) -> Result<usize>;

    /// Number of stored records.
    fn count_fees(&self) -> Result<usize>;
}

/// RocksDB-backed implementation of FeeStore.
///
/// Column families:
/// - fees: postcard-encoded `FeeRecord` keyed by `'F' + tx hash`
pub struct RocksFeeStore {
    db: DB,
    /// Serializes the read-check-write sequence of inserts.
    write_lock: Mutex<()>,
}

impl RocksFeeStore {
    /// Open or create a RocksDB database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![ColumnFamilyDescriptor::new("fees", Options::default())];

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }

    fn contains(&self, cf: &rocksdb::ColumnFamily, key: &[u8]) -> Result<bool> {
        Ok(self
            .db
            .get_pinned_cf(cf, key)
            .context("Failed to read fee record")?
            .is_some())
    }
}

impl FeeStore for RocksFeeStore {
    fn get_fee(&self, tx_hash: B256) -> Result<Option<FeeRecord>> {
        let cf = self.get_cf("fees")?;
        let key = encode_fee_key(tx_hash);
        match self.db.get_cf(cf, &key).context("Failed to get fee record")? {
            Some(bytes) => {
                let record = postcard::from_bytes(&bytes)
                    .context("Failed to deserialize fee record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn put_fee(&self, record: &FeeRecord) -> Result<bool> {
        let cf = self.get_cf("fees")?;
        let key = encode_fee_key(record.transaction_id);
        let value = postcard::to_allocvec(record).context("Failed to serialize fee record")?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Fee store write lock poisoned"))?;
        if self.contains(cf, &key)? {
            return Ok(false);
        }
        self.db
            .put_cf(cf, &key, &value)
            .context("Failed to put fee record")?;
        Ok(true)
    }

    fn put_fees(&self, records: &[FeeRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let cf = self.get_cf("fees")?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Fee store write lock poisoned"))?;

        let mut batch = WriteBatch::default();
        let mut staged = std::collections::HashSet::new();
        for record in records {
            let key = encode_fee_key(record.transaction_id);
            if !staged.insert(record.transaction_id) || self.contains(cf, &key)? {
                continue;
            }
            let value =
                postcard::to_allocvec(record).context("Failed to serialize fee record")?;
            batch.put_cf(cf, &key, &value);
        }

        let written = batch.len();
        if written > 0 {
            self.db.write(batch).context("Failed to write fee batch")?;
        }
        Ok(written)
    }

    fn count_fees(&self) -> Result<usize> {
        let cf = self.get_cf("fees")?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _) = item.context("Failed to read iterator")?;
            if decode_fee_key(&key).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }
}
