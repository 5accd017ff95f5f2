// Ledger module - THE TRANSFER HISTORY
// Append-only per-address history with cumulative totals and idempotent ingestion

mod model;
mod state;

pub use model::{Direction, IngestOutcome, Transfer, BURN_ADDRESS};
pub use state::{AddressRecord, LedgerError, LedgerStatistics, TransferLedger};
