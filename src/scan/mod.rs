// Scan module - INGESTION
// Batch-windowed, resumable transfer ingestion from an abstract source

mod scanner;
mod source;

pub use scanner::{ScanConfig, ScanError, ScanReport, Scanner};
pub use source::{MockTransferSource, SourceError, TransferEvent, TransferSource};
