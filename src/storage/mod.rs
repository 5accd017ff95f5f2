// Storage module - PERSISTENCE
// Whole-snapshot ledger persistence using sled

mod store;

pub use store::{LedgerStore, StorageStats, StoreError};
