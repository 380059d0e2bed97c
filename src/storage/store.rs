// MarketStore - Persistent key-value storage using sled
//
// Holds the marketplace snapshot plus a few bookkeeping keys. The core never
// talks to sled directly; it reads and writes whole snapshots through here.

use crate::config::MarketConfig;
use crate::error::MarketError;
use crate::hub::{MarketSnapshot, Marketplace, SnapshotError};
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Key prefixes for organizing data
mod keys {
    pub const SNAPSHOT: &[u8] = b"market:snapshot";
    pub const SAVED_AT: &[u8] = b"market:saved_at";
    pub const BACKUP_PREFIX: &[u8] = b"market:backup:";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),

    #[error("Stored state is inconsistent: {0}")]
    Inconsistent(#[from] MarketError),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

impl From<SnapshotError> for StoreError {
    fn from(err: SnapshotError) -> Self {
        StoreError::DeserializationFailed(err.to_string())
    }
}

/// Statistics about the storage
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Number of keys in the database
    pub key_count: usize,
    /// Approximate disk size in bytes
    pub disk_size_bytes: u64,
}

/// Persistent store for marketplace snapshots
///
/// Uses sled for crash-safe, embedded storage.
/// All writes are atomic and durable after flush.
pub struct MarketStore {
    db: sled::Db,
}

impl MarketStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    // ========================================================================
    // RAW KEY-VALUE OPERATIONS
    // ========================================================================

    /// Put raw bytes
    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    /// Get raw bytes
    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    /// Delete a key
    pub fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db.remove(key)?;
        Ok(())
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    /// Save the current snapshot, keeping the previous one as a backup
    pub fn save_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), StoreError> {
        let bytes = snapshot.to_bytes();
        let saved_at = Utc::now();

        if let Some(previous) = self.get_raw(keys::SNAPSHOT)? {
            let backup_key = [keys::BACKUP_PREFIX, saved_at.timestamp_millis().to_be_bytes().as_slice()].concat();
            self.put_raw(&backup_key, &previous)?;
        }

        let mut batch = sled::Batch::default();
        batch.insert(keys::SNAPSHOT, bytes.as_slice());
        batch.insert(keys::SAVED_AT, saved_at.to_rfc3339().as_bytes());
        self.db.apply_batch(batch)?;

        debug!(bytes = bytes.len(), "snapshot saved");
        Ok(())
    }

    /// Load the latest snapshot, if any
    pub fn load_snapshot(&self) -> Result<Option<MarketSnapshot>, StoreError> {
        match self.get_raw(keys::SNAPSHOT)? {
            Some(bytes) => Ok(Some(MarketSnapshot::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// When the latest snapshot was written
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.get_raw(keys::SAVED_AT)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                let at = DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(at.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // MARKETPLACE
    // ========================================================================

    /// Load the marketplace, or start an empty one if nothing was saved yet
    pub fn load_marketplace(&self, config: MarketConfig) -> Result<Marketplace, StoreError> {
        match self.load_snapshot()? {
            Some(snapshot) => Ok(Marketplace::restore(snapshot, config)?),
            None => {
                info!("no saved state, starting an empty marketplace");
                Ok(Marketplace::new(config))
            }
        }
    }

    /// Snapshot the marketplace and flush it to disk
    pub fn save_marketplace(&self, marketplace: &Marketplace) -> Result<(), StoreError> {
        self.save_snapshot(&marketplace.snapshot())?;
        self.flush()
    }

    /// Number of backups kept
    pub fn backup_count(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for result in self.db.scan_prefix(keys::BACKUP_PREFIX) {
            result?;
            count += 1;
        }
        Ok(count)
    }

    /// Keep only the newest `keep` backups. Returns how many were removed.
    pub fn prune_backups(&self, keep: usize) -> Result<usize, StoreError> {
        let mut backup_keys = Vec::new();
        for result in self.db.scan_prefix(keys::BACKUP_PREFIX) {
            let (key, _) = result?;
            backup_keys.push(key.to_vec());
        }
        // Keys embed big-endian millis, so byte order is age order
        let excess = backup_keys.len().saturating_sub(keep);
        for key in backup_keys.iter().take(excess) {
            self.db.remove(key)?;
        }
        if excess > 0 {
            info!(removed = excess, kept = keep, "old snapshots pruned");
        }
        Ok(excess)
    }
}
