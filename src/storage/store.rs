// LedgerStore - Persistent snapshot storage using sled
//
// The ledger is persisted as one whole snapshot per save. A missing
// snapshot means a fresh start; a corrupt snapshot is an error that
// requires operator attention, never a silent empty ledger.

use crate::ledger::{LedgerError, TransferLedger};
use std::path::Path;
use thiserror::Error;

/// Key prefixes for organizing data
mod keys {
    pub const LEDGER_SNAPSHOT: &[u8] = b"ledger:snapshot";
    pub const LEDGER_SAVED_AT_BLOCK: &[u8] = b"ledger:saved_at_block";
}

/// Errors from storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
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

/// Persistent store for ledger snapshots
///
/// Uses sled for crash-safe, embedded storage.
/// All writes are atomic and durable after flush.
pub struct LedgerStore {
    db: sled::Db,
}

impl LedgerStore {
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

    fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    // ========================================================================
    // LEDGER SNAPSHOT PERSISTENCE
    // ========================================================================

    /// Save a whole-ledger snapshot
    pub fn save_ledger(&self, ledger: &TransferLedger) -> Result<(), StoreError> {
        let bytes = ledger.to_bytes();
        if bytes.is_empty() && !ledger.is_empty() {
            return Err(StoreError::SerializationFailed(
                "ledger snapshot encoded to zero bytes".to_string(),
            ));
        }
        self.put_raw(keys::LEDGER_SNAPSHOT, &bytes)?;
        let saved_at = ledger.max_block().unwrap_or(0);
        self.put_raw(keys::LEDGER_SAVED_AT_BLOCK, &saved_at.to_be_bytes())
    }

    /// Load the persisted ledger snapshot, if any
    pub fn load_ledger(&self) -> Result<Option<TransferLedger>, StoreError> {
        match self.get_raw(keys::LEDGER_SNAPSHOT)? {
            Some(bytes) => {
                let ledger = TransferLedger::from_bytes(&bytes)
                    .map_err(|e: LedgerError| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(ledger))
            }
            None => Ok(None),
        }
    }

    /// Block height recorded with the last snapshot, if any
    ///
    /// Purely informational (for logs and tooling); resume points are always
    /// recovered from the snapshot itself.
    pub fn saved_at_block(&self) -> Result<Option<u64>, StoreError> {
        match self.get_raw(keys::LEDGER_SAVED_AT_BLOCK)? {
            Some(bytes) => {
                if bytes.len() != 8 {
                    return Err(StoreError::DeserializationFailed(
                        "Invalid saved-block length".to_string(),
                    ));
                }
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }
}
