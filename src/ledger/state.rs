// Transfer Ledger - Append-only per-address transfer history

use crate::ledger::model::{Direction, IngestOutcome, Transfer};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Transfer amount must be greater than zero")]
    ZeroAmount,

    #[error("Cumulative total overflow for address {address}")]
    AmountOverflow { address: Address },

    #[error("Deserialization failed")]
    DeserializationFailed,
}

/// Summary counters over the whole ledger
#[derive(Clone, Debug)]
pub struct LedgerStatistics {
    pub address_count: usize,
    pub transfer_count: u64,
    pub total_in: U256,
    pub total_out: U256,
}

/// Accumulated history for a single address
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    cumulative_in: U256,
    cumulative_out: U256,
    transfers: Vec<Transfer>,
}

impl AddressRecord {
    /// Total amount ever received
    pub fn cumulative_in(&self) -> U256 {
        self.cumulative_in
    }

    /// Total amount ever sent
    pub fn cumulative_out(&self) -> U256 {
        self.cumulative_out
    }

    /// All transfers in ingestion order
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Current holdings: cumulative in minus cumulative out, floored at zero
    ///
    /// An address funded before the scan window can show more out than in;
    /// see [`AddressRecord::is_overdrawn`].
    pub fn balance(&self) -> U256 {
        self.cumulative_in.saturating_sub(self.cumulative_out)
    }

    /// True when recorded outflow exceeds recorded inflow
    pub fn is_overdrawn(&self) -> bool {
        self.cumulative_out > self.cumulative_in
    }

    /// Transfers received by this address
    pub fn inbound(&self) -> impl Iterator<Item = &Transfer> {
        self.transfers
            .iter()
            .filter(|t| t.direction() == Direction::In)
    }

    /// Transfers sent by this address
    pub fn outbound(&self) -> impl Iterator<Item = &Transfer> {
        self.transfers
            .iter()
            .filter(|t| t.direction() == Direction::Out)
    }

    /// Transfers on the given side
    pub fn side(&self, direction: Direction) -> impl Iterator<Item = &Transfer> + '_ {
        self.transfers
            .iter()
            .filter(move |t| t.direction() == direction)
    }
}

/// The transfer ledger: every known transfer, grouped by address
///
/// Append-only. Ingestion adds transfers; nothing mutates or removes them.
/// The map is ordered so that whole-ledger walks (aggregation, recovery
/// scans) are deterministic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferLedger {
    /// Address -> accumulated record
    records: BTreeMap<Address, AddressRecord>,
    /// Index: (party, side, tx hash) -> already recorded
    #[serde(skip)]
    seen: HashSet<(Address, Direction, B256)>,
}

impl TransferLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            seen: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of addresses with at least one transfer
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Look up the record for an address
    pub fn record(&self, address: &Address) -> Option<&AddressRecord> {
        self.records.get(address)
    }

    /// All records in address order
    pub fn records(&self) -> impl Iterator<Item = (&Address, &AddressRecord)> {
        self.records.iter()
    }

    /// All known addresses in order
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.records.keys()
    }

    /// Balance of an address, zero if unknown
    pub fn balance_of(&self, address: &Address) -> U256 {
        self.records
            .get(address)
            .map(|r| r.balance())
            .unwrap_or(U256::ZERO)
    }

    /// Offer one transfer to the ledger
    ///
    /// Idempotent: if the hash already exists in the sender's out-list or
    /// the receiver's in-list, nothing changes and `Duplicate` is returned.
    /// The null address never receives a record or balance updates on
    /// either side; an event between two null parties stores nothing and
    /// reports `Duplicate` on every offer.
    pub fn ingest_transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
        block_number: u64,
        tx_hash: B256,
    ) -> Result<IngestOutcome, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        // A null-to-null event touches no record, so there is never
        // anything new in it.
        if from == Address::ZERO && to == Address::ZERO {
            return Ok(IngestOutcome::Duplicate);
        }

        if self.seen.contains(&(from, Direction::Out, tx_hash))
            || self.seen.contains(&(to, Direction::In, tx_hash))
        {
            return Ok(IngestOutcome::Duplicate);
        }

        // Check both cumulative totals before touching either record, so a
        // failed ingest leaves no partial state behind.
        let new_out = if from != Address::ZERO {
            let current = self
                .records
                .get(&from)
                .map(|r| r.cumulative_out)
                .unwrap_or(U256::ZERO);
            Some(
                current
                    .checked_add(amount)
                    .ok_or(LedgerError::AmountOverflow { address: from })?,
            )
        } else {
            None
        };
        let new_in = if to != Address::ZERO {
            let current = self
                .records
                .get(&to)
                .map(|r| r.cumulative_in)
                .unwrap_or(U256::ZERO);
            Some(
                current
                    .checked_add(amount)
                    .ok_or(LedgerError::AmountOverflow { address: to })?,
            )
        } else {
            None
        };

        if let Some(total) = new_out {
            let record = self.records.entry(from).or_default();
            record.cumulative_out = total;
            record
                .transfers
                .push(Transfer::new(Direction::Out, to, amount, block_number, tx_hash));
            self.seen.insert((from, Direction::Out, tx_hash));
        }
        if let Some(total) = new_in {
            let record = self.records.entry(to).or_default();
            record.cumulative_in = total;
            record
                .transfers
                .push(Transfer::new(Direction::In, from, amount, block_number, tx_hash));
            self.seen.insert((to, Direction::In, tx_hash));
        }

        Ok(IngestOutcome::Recorded)
    }

    /// Highest block number across every recorded transfer
    ///
    /// This is how a restarted scanner recovers its resume point.
    pub fn max_block(&self) -> Option<u64> {
        self.records
            .values()
            .flat_map(|r| r.transfers.iter())
            .map(|t| t.block_number())
            .max()
    }

    /// Every transaction hash the ledger knows about
    ///
    /// Seeds the scanner's in-memory dedup set at startup.
    pub fn tx_hashes(&self) -> HashSet<B256> {
        self.records
            .values()
            .flat_map(|r| r.transfers.iter())
            .map(|t| t.tx_hash())
            .collect()
    }

    /// Summary counters
    pub fn statistics(&self) -> LedgerStatistics {
        let mut stats = LedgerStatistics {
            address_count: self.records.len(),
            transfer_count: 0,
            total_in: U256::ZERO,
            total_out: U256::ZERO,
        };
        for record in self.records.values() {
            stats.transfer_count += record.transfers.len() as u64;
            stats.total_in = stats.total_in.saturating_add(record.cumulative_in);
            stats.total_out = stats.total_out.saturating_add(record.cumulative_out);
        }
        stats
    }

    /// Serialize the whole ledger to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize a ledger snapshot
    ///
    /// A corrupt snapshot is an error; it is never replaced by an empty
    /// ledger, so load failures stay visible to the operator.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut ledger: TransferLedger =
            postcard::from_bytes(bytes).map_err(|_| LedgerError::DeserializationFailed)?;
        ledger.rebuild_index();
        Ok(ledger)
    }

    /// Rebuild the dedup index from the records (after deserialization)
    fn rebuild_index(&mut self) {
        self.seen.clear();
        for (address, record) in &self.records {
            for transfer in &record.transfers {
                self.seen
                    .insert((*address, transfer.direction(), transfer.tx_hash()));
            }
        }
    }
}

impl Default for TransferLedger {
    fn default() -> Self {
        Self::new()
    }
}
