// Transfer Source - Where chain events come from
// Implementations wrap an RPC or archive backend and deliver decoded
// transfer events for block windows; the engine only sees this trait.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// TRANSFER EVENT
// ============================================================================

/// A decoded transfer event as delivered by a source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    from: Address,
    to: Address,
    amount: U256,
    block_number: u64,
    tx_hash: B256,
}

impl TransferEvent {
    pub fn new(from: Address, to: Address, amount: U256, block_number: u64, tx_hash: B256) -> Self {
        Self {
            from,
            to,
            amount,
            block_number,
            tx_hash,
        }
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Address {
        self.to
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }
}

// ============================================================================
// SOURCE ERROR
// ============================================================================

/// Errors reported by a transfer source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Fetch failed for blocks {from_block}..={to_block}: {reason}")]
    FetchFailed {
        from_block: u64,
        to_block: u64,
        reason: String,
    },
}

// ============================================================================
// TRANSFER SOURCE TRAIT
// ============================================================================

/// Trait for transfer event sources (RPC nodes, archives, fixtures)
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Current chain head block number
    ///
    /// Also serves as the startup connectivity probe: a scanner treats a
    /// failure here as fatal.
    async fn chain_head(&self) -> Result<u64, SourceError>;

    /// All transfer events for a token in the inclusive block window
    async fn fetch_transfers(
        &self,
        token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, SourceError>;
}

// ============================================================================
// MOCK TRANSFER SOURCE
// ============================================================================

/// Mock implementation of TransferSource for testing
pub struct MockTransferSource {
    head: u64,
    events: Vec<TransferEvent>,
    failing_windows: Vec<(u64, u64)>,
    head_failures: usize,
    delay_ms: u64,
    head_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockTransferSource {
    /// Create a new mock source with a fixed chain head
    pub fn new(head: u64) -> Self {
        Self {
            head,
            events: Vec::new(),
            failing_windows: Vec::new(),
            head_failures: 0,
            delay_ms: 0,
            head_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Script the events this source will deliver
    pub fn with_events(mut self, events: Vec<TransferEvent>) -> Self {
        self.events = events;
        self
    }

    /// Add a single scripted event
    pub fn with_event(mut self, event: TransferEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Any fetch overlapping this window fails
    pub fn with_failing_window(mut self, from_block: u64, to_block: u64) -> Self {
        self.failing_windows.push((from_block, to_block));
        self
    }

    /// Fail the first N chain head probes
    pub fn with_head_failures(mut self, failures: usize) -> Self {
        self.head_failures = failures;
        self
    }

    /// Add a delay before responding
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    /// Number of chain head probes so far
    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    /// Number of fetch calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferSource for MockTransferSource {
    async fn chain_head(&self) -> Result<u64, SourceError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        let call_num = self.head_calls.fetch_add(1, Ordering::SeqCst);
        if call_num < self.head_failures {
            return Err(SourceError::ConnectionFailed(
                "mock source offline".to_string(),
            ));
        }
        Ok(self.head)
    }

    async fn fetch_transfers(
        &self,
        _token: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, SourceError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self
            .failing_windows
            .iter()
            .any(|&(a, b)| from_block <= b && a <= to_block)
        {
            return Err(SourceError::FetchFailed {
                from_block,
                to_block,
                reason: "mock window failure".to_string(),
            });
        }

        Ok(self
            .events
            .iter()
            .filter(|e| e.block_number >= from_block && e.block_number <= to_block)
            .cloned()
            .collect())
    }
}
