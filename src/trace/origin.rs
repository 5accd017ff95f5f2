// Origin Resolution - Backward breadth-first search to the nearest label
//
// Walks inbound edges most-recent-first until a labeled ancestor is found.
// A custodial label anywhere on the path makes the flow unattributable:
// custodial wallets pool funds from many parties, so everything behind
// them is opaque.

use crate::labels::LabelRegistry;
use crate::ledger::{Transfer, TransferLedger, BURN_ADDRESS};
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Default bound on backward search depth
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// A successful origin resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedOrigin {
    address: Address,
    label: String,
}

impl TracedOrigin {
    /// The labeled ancestor the flow was attributed to
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Resolve the nearest labeled ancestor of an address
///
/// Breadth-first over inbound transfers, most recent block first, ties by
/// descending transaction hash. Each address is processed at most once.
/// Nodes at `max_depth` are still checked for a label but not expanded, so
/// a label at depth `max_depth` resolves and one further out does not.
///
/// Returns `None` when the queue is exhausted, when the start address has
/// no recorded transfers, or when the search reaches a custodial label.
/// All of these are ordinary outcomes, not errors.
pub fn resolve_origin(
    ledger: &TransferLedger,
    registry: &LabelRegistry,
    start: Address,
    max_depth: usize,
) -> Option<TracedOrigin> {
    let record = ledger.record(&start)?;
    if record.transfers().is_empty() {
        return None;
    }

    let mut visited: HashSet<Address> = HashSet::new();
    let mut queue: VecDeque<(Address, usize)> = VecDeque::new();
    queue.push_back((start, 0));

    while let Some((address, depth)) = queue.pop_front() {
        if visited.contains(&address) {
            continue;
        }
        visited.insert(address);

        if let Some(label) = registry.get(&address) {
            if label.is_custodial() {
                return None;
            }
            return Some(TracedOrigin {
                address,
                label: label.name().to_string(),
            });
        }

        if depth >= max_depth {
            continue;
        }

        let Some(record) = ledger.record(&address) else {
            continue;
        };

        let mut inbound: Vec<&Transfer> = record
            .inbound()
            .filter(|t| t.counterparty() != Address::ZERO && t.counterparty() != BURN_ADDRESS)
            .collect();
        inbound.sort_by(|a, b| {
            b.block_number()
                .cmp(&a.block_number())
                .then(b.tx_hash().cmp(&a.tx_hash()))
        });

        for transfer in inbound {
            let sender = transfer.counterparty();
            if !visited.contains(&sender) {
                queue.push_back((sender, depth + 1));
            }
        }
    }

    None
}
