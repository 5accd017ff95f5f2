// Flow Tracing - Amount-conserving provenance over individual transfers
//
// Follows the value of a single transfer forward (where did it end up) or
// backward (where did it come from). An address is never credited with
// propagating more value than actually passed through it: every hop
// follows min(leg amount, amount still available), and aggregated label
// totals are scaled down proportionally when independent branches
// over-attribute.

use crate::labels::LabelRegistry;
use crate::ledger::{Direction, Transfer, TransferLedger};
use alloy_primitives::{Address, B256, U256, U512};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// ATTRIBUTION RESULTS
// ============================================================================

/// Value from a traced transfer that reached a labeled address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAttribution {
    label: String,
    amount: U256,
    /// The transaction that connected the labeled address to the traced path
    tx_hash: B256,
}

impl FlowAttribution {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }
}

/// Total value attributed to one label across a whole address side
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFlow {
    label: String,
    amount: U256,
}

impl LabelFlow {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> U256 {
        self.amount
    }
}

// ============================================================================
// FLOW TRACER
// ============================================================================

/// One side of a transaction as recorded in some address's history
#[derive(Clone, Debug)]
struct TxLeg {
    address: Address,
    direction: Direction,
    amount: U256,
}

/// A branch of the walk: one transfer to follow, how much value is still
/// available to push through it, and the branch's own visited set
struct Frame<'t> {
    transfer: &'t Transfer,
    available: U256,
    visited: HashSet<B256>,
}

/// Per-transfer provenance tracer over a ledger snapshot
///
/// Indexes every transaction leg once at construction; tracing itself is
/// read-only and allocation-bounded by the per-branch visited sets.
pub struct FlowTracer<'a> {
    ledger: &'a TransferLedger,
    registry: &'a LabelRegistry,
    /// Every leg of every transaction, keyed by hash
    tx_index: HashMap<B256, Vec<TxLeg>>,
}

impl<'a> FlowTracer<'a> {
    /// Build a tracer over a ledger snapshot and a label registry
    pub fn new(ledger: &'a TransferLedger, registry: &'a LabelRegistry) -> Self {
        let mut tx_index: HashMap<B256, Vec<TxLeg>> = HashMap::new();
        for (address, record) in ledger.records() {
            for transfer in record.transfers() {
                tx_index.entry(transfer.tx_hash()).or_default().push(TxLeg {
                    address: *address,
                    direction: transfer.direction(),
                    amount: transfer.amount(),
                });
            }
        }
        Self {
            ledger,
            registry,
            tx_index,
        }
    }

    /// Number of indexed transactions
    pub fn transaction_count(&self) -> usize {
        self.tx_index.len()
    }

    /// Trace one transfer to the labeled addresses its value reached
    ///
    /// An `Out` transfer is traced forward through the receivers' later
    /// outgoing legs; an `In` transfer is traced backward through the
    /// senders' earlier incoming legs. Branches fan out with independent
    /// visited sets; within the walk, attributions are deduplicated by
    /// (label, transaction) keeping the maximum amount, so several routes
    /// into the same labeled reception count once.
    ///
    /// Results are sorted by descending amount. An empty result is an
    /// ordinary outcome, not an error.
    pub fn trace_transfer<'s>(&'s self, transfer: &'s Transfer) -> Vec<FlowAttribution> {
        let side = transfer.direction();
        let mut best: HashMap<(String, B256), U256> = HashMap::new();

        let mut stack = vec![Frame {
            transfer,
            available: transfer.amount(),
            visited: HashSet::new(),
        }];

        while let Some(frame) = stack.pop() {
            let leg = frame.transfer;
            let follow = frame.available.min(leg.amount());
            if follow.is_zero() || frame.visited.contains(&leg.tx_hash()) {
                continue;
            }
            let mut visited = frame.visited;
            visited.insert(leg.tx_hash());

            let counterparty = leg.counterparty();
            let Some(legs) = self.tx_index.get(&leg.tx_hash()) else {
                continue;
            };

            for counterpart in legs
                .iter()
                .filter(|l| l.direction == side.opposite() && l.address == counterparty)
            {
                let actual = counterpart.amount.min(follow);

                if let Some(label) = self.registry.label_name(&counterparty) {
                    let entry = best
                        .entry((label.to_string(), leg.tx_hash()))
                        .or_insert(U256::ZERO);
                    if actual > *entry {
                        *entry = actual;
                    }
                    continue;
                }

                for next in self.continuations(&counterparty, side, leg.block_number()) {
                    if visited.contains(&next.tx_hash()) {
                        continue;
                    }
                    stack.push(Frame {
                        transfer: next,
                        available: actual,
                        visited: visited.clone(),
                    });
                }
            }
        }

        let mut results: Vec<FlowAttribution> = best
            .into_iter()
            .map(|((label, tx_hash), amount)| FlowAttribution {
                label,
                amount,
                tx_hash,
            })
            .collect();
        results.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.label.cmp(&b.label))
                .then_with(|| a.tx_hash.cmp(&b.tx_hash))
        });
        results
    }

    /// Attribute one side of an address's history to labels
    ///
    /// Traces every transfer on that side, deduplicates attributions by
    /// (label, transaction that reached the label) keeping the maximum,
    /// sums per label, then enforces conservation: when the
    /// attributed sum exceeds the address's true cumulative total for the
    /// side, every label amount is scaled down proportionally with integer
    /// arithmetic. The result never overstates ground truth.
    pub fn attribute_flows(&self, address: &Address, direction: Direction) -> Vec<LabelFlow> {
        let Some(record) = self.ledger.record(address) else {
            return Vec::new();
        };

        let mut best: HashMap<(String, B256), U256> = HashMap::new();
        for transfer in record.side(direction) {
            for attribution in self.trace_transfer(transfer) {
                let FlowAttribution {
                    label,
                    amount,
                    tx_hash,
                } = attribution;
                let entry = best.entry((label, tx_hash)).or_insert(U256::ZERO);
                if amount > *entry {
                    *entry = amount;
                }
            }
        }

        let mut totals: HashMap<String, U256> = HashMap::new();
        for ((label, _), amount) in best {
            let entry = totals.entry(label).or_insert(U256::ZERO);
            *entry = entry.saturating_add(amount);
        }

        let true_total = match direction {
            Direction::In => record.cumulative_in(),
            Direction::Out => record.cumulative_out(),
        };
        let attributed = totals
            .values()
            .fold(U256::ZERO, |acc, v| acc.saturating_add(*v));
        if attributed > true_total {
            for amount in totals.values_mut() {
                *amount = scale_down(*amount, true_total, attributed);
            }
        }

        let mut flows: Vec<LabelFlow> = totals
            .into_iter()
            .map(|(label, amount)| LabelFlow { label, amount })
            .collect();
        flows.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.label.cmp(&b.label)));
        flows
    }

    /// Same-side transfers an unlabeled counterpart could have passed the
    /// value on through: later outgoing legs when tracing forward, earlier
    /// incoming legs when tracing backward. Same-block legs count on both
    /// sides.
    fn continuations(
        &self,
        address: &Address,
        side: Direction,
        block_number: u64,
    ) -> Vec<&'a Transfer> {
        let Some(record) = self.ledger.record(address) else {
            return Vec::new();
        };
        let mut legs: Vec<&'a Transfer> = record
            .side(side)
            .filter(|t| match side {
                Direction::Out => t.block_number() >= block_number,
                Direction::In => t.block_number() <= block_number,
            })
            .collect();
        match side {
            Direction::Out => legs.sort_by_key(|t| t.block_number()),
            Direction::In => legs.sort_by(|a, b| b.block_number().cmp(&a.block_number())),
        }
        legs
    }
}

/// amount * true_total / attributed with a 512-bit intermediate, floored
///
/// Only called with attributed > true_total, so the result only shrinks.
fn scale_down(amount: U256, true_total: U256, attributed: U256) -> U256 {
    if attributed.is_zero() {
        return U256::ZERO;
    }
    let scaled = (U512::from(amount) * U512::from(true_total)) / U512::from(attributed);
    U256::saturating_from(scaled)
}
