// Scanner - Batch-windowed, resumable transfer ingestion
//
// The scanner is the only writer of the ledger. It resumes from the highest
// block already recorded, walks the chain head in fixed windows, skips
// windows whose fetch fails, and persists the whole ledger after every
// window that produced events, before advancing past it.

use crate::ledger::{IngestOutcome, LedgerError, TransferLedger};
use crate::scan::source::TransferSource;
use crate::storage::{LedgerStore, StoreError};
use alloy_primitives::{Address, B256};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

// ============================================================================
// SCAN CONFIG
// ============================================================================

/// Configuration for the scanner
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Token contract whose transfers are ingested
    pub token: Address,
    /// First block of interest (must be >= 1)
    pub start_block: u64,
    /// Blocks per fetch window
    pub batch_size: u64,
    /// Pause between fetch windows in milliseconds
    pub throttle_ms: u64,
    /// Sleep between passes in continuous mode, in seconds
    pub poll_interval_secs: u64,
    /// Sleep after a failed pass in continuous mode, in seconds
    pub retry_delay_secs: u64,
}

impl ScanConfig {
    /// Create a new config with builder pattern
    pub fn new(token: Address, start_block: u64) -> Self {
        Self {
            token,
            start_block,
            ..Self::default()
        }
    }

    /// Set the fetch window size in blocks
    pub fn with_batch_size(mut self, blocks: u64) -> Self {
        self.batch_size = blocks;
        self
    }

    /// Set the pause between fetch windows
    pub fn with_throttle_ms(mut self, ms: u64) -> Self {
        self.throttle_ms = ms;
        self
    }

    /// Set the sleep between continuous passes
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Set the sleep after a failed continuous pass
    pub fn with_retry_delay_secs(mut self, secs: u64) -> Self {
        self.retry_delay_secs = secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.batch_size == 0 {
            return Err(ScanError::InvalidConfig(
                "batch_size must be > 0".to_string(),
            ));
        }
        if self.start_block == 0 {
            return Err(ScanError::InvalidConfig(
                "start_block must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            token: Address::ZERO,
            start_block: 1,
            batch_size: 1000,
            throttle_ms: 100,
            poll_interval_secs: 60,
            retry_delay_secs: 60,
        }
    }
}

// ============================================================================
// SCAN REPORT
// ============================================================================

/// Counters for one scan pass
#[derive(Clone, Debug, Default)]
pub struct ScanReport {
    /// Chain head at the start of the pass
    pub head_block: u64,
    /// First block of the scanned range
    pub from_block: u64,
    /// Last block of the scanned range
    pub to_block: u64,
    /// Fetch windows attempted
    pub batches: u64,
    /// Fetch windows skipped after a failed fetch
    pub failed_batches: u64,
    /// Events delivered by the source
    pub events_seen: u64,
    /// Events newly recorded in the ledger
    pub recorded: u64,
    /// Events skipped as already known
    pub duplicates: u64,
    /// Zero-amount events skipped
    pub zero_amount_skipped: u64,
    /// Ledger snapshots written
    pub persists: u64,
}

// ============================================================================
// SCAN ERROR
// ============================================================================

/// Errors that can occur while scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Event source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage failure: {0}")]
    Store(StoreError),

    #[error("Ledger rejected transfer: {0}")]
    Ledger(LedgerError),
}

impl From<StoreError> for ScanError {
    fn from(err: StoreError) -> Self {
        ScanError::Store(err)
    }
}

impl From<LedgerError> for ScanError {
    fn from(err: LedgerError) -> Self {
        ScanError::Ledger(err)
    }
}

// ============================================================================
// SCANNER
// ============================================================================

/// Resumable transfer scanner over an abstract source
pub struct Scanner {
    source: Box<dyn TransferSource>,
    store: LedgerStore,
    config: ScanConfig,
    ledger: TransferLedger,
    /// Every hash ever offered, seeded from the ledger at startup
    seen_hashes: HashSet<B256>,
    last_processed_block: u64,
}

impl Scanner {
    /// Create a scanner, loading any persisted ledger from the store
    ///
    /// The resume point is recovered from the ledger itself: the highest
    /// recorded block, or `start_block - 1` for a fresh ledger.
    pub fn new(
        source: Box<dyn TransferSource>,
        store: LedgerStore,
        config: ScanConfig,
    ) -> Result<Self, ScanError> {
        config.validate()?;

        let ledger = store.load_ledger()?.unwrap_or_default();
        let seen_hashes = ledger.tx_hashes();
        let last_processed_block = ledger.max_block().unwrap_or(config.start_block - 1);

        info!(
            addresses = ledger.len(),
            known_hashes = seen_hashes.len(),
            resume_block = last_processed_block,
            "scanner initialized"
        );

        Ok(Self {
            source,
            store,
            config,
            ledger,
            seen_hashes,
            last_processed_block,
        })
    }

    /// The ledger as of the last completed window
    pub fn ledger(&self) -> &TransferLedger {
        &self.ledger
    }

    /// Consume the scanner and keep the ledger
    pub fn into_ledger(self) -> TransferLedger {
        self.ledger
    }

    /// The backing store
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Highest block whose window has been processed
    pub fn last_processed_block(&self) -> u64 {
        self.last_processed_block
    }

    /// Run a single scan pass up to the current chain head
    ///
    /// A failed head probe is fatal for the pass. A failed window fetch is
    /// logged, counted and skipped; the window is not retried.
    pub async fn run_once(&mut self) -> Result<ScanReport, ScanError> {
        let head = self
            .source
            .chain_head()
            .await
            .map_err(|e| ScanError::SourceUnavailable(e.to_string()))?;

        let mut report = ScanReport {
            head_block: head,
            from_block: self.last_processed_block + 1,
            to_block: head,
            ..ScanReport::default()
        };

        if self.last_processed_block >= head {
            debug!(head, "ledger already at chain head");
            return Ok(report);
        }

        info!(
            from = report.from_block,
            to = head,
            batch_size = self.config.batch_size,
            "scanning block range"
        );

        let mut cur = self.last_processed_block + 1;
        while cur <= head {
            let end = cur.saturating_add(self.config.batch_size - 1).min(head);

            match self.source.fetch_transfers(self.config.token, cur, end).await {
                Ok(events) => {
                    report.batches += 1;
                    report.events_seen += events.len() as u64;

                    for event in &events {
                        if self.seen_hashes.contains(&event.tx_hash()) {
                            report.duplicates += 1;
                            continue;
                        }
                        if event.amount().is_zero() {
                            report.zero_amount_skipped += 1;
                            continue;
                        }
                        match self.ledger.ingest_transfer(
                            event.from(),
                            event.to(),
                            event.amount(),
                            event.block_number(),
                            event.tx_hash(),
                        )? {
                            IngestOutcome::Recorded => report.recorded += 1,
                            IngestOutcome::Duplicate => report.duplicates += 1,
                        }
                        self.seen_hashes.insert(event.tx_hash());
                    }

                    // Persist before advancing past the window, so a crash
                    // re-scans at most the current window.
                    if !events.is_empty() {
                        self.store.save_ledger(&self.ledger)?;
                        self.store.flush()?;
                        report.persists += 1;
                        debug!(
                            from = cur,
                            to = end,
                            events = events.len(),
                            "window persisted"
                        );
                    }
                }
                Err(e) => {
                    report.failed_batches += 1;
                    warn!(from = cur, to = end, error = %e, "window fetch failed; skipping");
                }
            }

            self.last_processed_block = end;
            cur = end + 1;

            if cur <= head && self.config.throttle_ms > 0 {
                sleep(Duration::from_millis(self.config.throttle_ms)).await;
            }
        }

        info!(
            recorded = report.recorded,
            duplicates = report.duplicates,
            failed_batches = report.failed_batches,
            last_block = self.last_processed_block,
            "scan pass complete"
        );

        Ok(report)
    }

    /// Scan forever, sleeping between passes
    ///
    /// A lost source is fatal and returned; any other pass failure is
    /// logged and retried after the configured delay.
    pub async fn run_continuous(&mut self) -> Result<(), ScanError> {
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            "starting continuous scan"
        );

        loop {
            match self.run_once().await {
                Ok(report) => {
                    if report.recorded > 0 {
                        info!(
                            recorded = report.recorded,
                            head = report.head_block,
                            "pass recorded new transfers"
                        );
                    }
                    sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
                }
                Err(ScanError::SourceUnavailable(reason)) => {
                    error!(%reason, "event source unavailable; stopping");
                    return Err(ScanError::SourceUnavailable(reason));
                }
                Err(e) => {
                    error!(
                        error = %e,
                        retry_delay_secs = self.config.retry_delay_secs,
                        "scan pass failed; retrying"
                    );
                    sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                }
            }
        }
    }
}
