// Sales Attribution - Who sold into which destination
//
// Walks every outgoing transfer into a fixed destination set (exchange
// deposit addresses, pools), resolves the seller back to a label with the
// backward origin search, and accumulates per-label, per-category volume.
// Unresolvable volume is reported separately, never hidden and never
// folded into a pseudo-label.

use crate::labels::LabelRegistry;
use crate::ledger::TransferLedger;
use crate::trace::{resolve_origin, DEFAULT_MAX_DEPTH};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// DESTINATION SET
// ============================================================================

/// Named destination categories over fixed address sets
///
/// Categories keep their first-insert order, which also fixes the column
/// order of every report row.
#[derive(Clone, Debug, Default)]
pub struct DestinationSet {
    categories: Vec<String>,
    by_address: HashMap<Address, usize>,
}

impl DestinationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address under a category, creating the category on
    /// first use
    pub fn insert(&mut self, category: &str, address: Address) {
        let index = match self.categories.iter().position(|c| c == category) {
            Some(index) => index,
            None => {
                self.categories.push(category.to_string());
                self.categories.len() - 1
            }
        };
        self.by_address.insert(address, index);
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.by_address.contains_key(address)
    }

    /// Category name for a destination address
    pub fn category_of(&self, address: &Address) -> Option<&str> {
        self.by_address
            .get(address)
            .map(|&i| self.categories[i].as_str())
    }

    fn category_index(&self, address: &Address) -> Option<usize> {
        self.by_address.get(address).copied()
    }

    /// Category names in first-insert order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of registered destination addresses
    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

// ============================================================================
// REPORT TYPES
// ============================================================================

/// Volume and transfer count for one category within a row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVolume {
    category: String,
    volume: U256,
    transfers: u64,
}

impl CategoryVolume {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn volume(&self) -> U256 {
        self.volume
    }

    pub fn transfers(&self) -> u64 {
        self.transfers
    }
}

/// Sales attributed to one labeled origin
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerRow {
    address: Address,
    label: String,
    total: U256,
    by_category: Vec<CategoryVolume>,
}

impl SellerRow {
    fn new(address: Address, label: String, categories: &[String]) -> Self {
        Self {
            address,
            label,
            total: U256::ZERO,
            by_category: categories
                .iter()
                .map(|c| CategoryVolume {
                    category: c.clone(),
                    volume: U256::ZERO,
                    transfers: 0,
                })
                .collect(),
        }
    }

    fn accumulate(&mut self, category_index: usize, amount: U256) {
        self.total = self.total.saturating_add(amount);
        let entry = &mut self.by_category[category_index];
        entry.volume = entry.volume.saturating_add(amount);
        entry.transfers += 1;
    }

    /// The labeled origin address the sales resolve to
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Grand total across all categories
    pub fn total(&self) -> U256 {
        self.total
    }

    /// Per-category volumes in the destination set's category order
    pub fn by_category(&self) -> &[CategoryVolume] {
        &self.by_category
    }

    pub fn category_volume(&self, category: &str) -> Option<&CategoryVolume> {
        self.by_category.iter().find(|c| c.category == category)
    }
}

/// Volume whose origin could not be resolved to any label
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedVolume {
    volume: U256,
    transfers: u64,
}

impl UnresolvedVolume {
    pub fn volume(&self) -> U256 {
        self.volume
    }

    pub fn transfers(&self) -> u64 {
        self.transfers
    }
}

/// Ranked sales attribution over a ledger snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesReport {
    categories: Vec<String>,
    rows: Vec<SellerRow>,
    unresolved: UnresolvedVolume,
}

impl SalesReport {
    /// Rows sorted by descending grand total; equal totals keep the order
    /// in which the sellers were first seen during the ledger walk
    pub fn rows(&self) -> &[SellerRow] {
        &self.rows
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Attributed volume that could not be traced to a label
    pub fn unresolved(&self) -> &UnresolvedVolume {
        &self.unresolved
    }

    /// Sum of all attributed rows
    pub fn total_attributed(&self) -> U256 {
        self.rows
            .iter()
            .fold(U256::ZERO, |acc, r| acc.saturating_add(r.total))
    }

    /// Attributed plus unresolved volume
    pub fn total_volume(&self) -> U256 {
        self.total_attributed().saturating_add(self.unresolved.volume)
    }

    /// Attributed volume for one category across all rows
    pub fn category_total(&self, category: &str) -> U256 {
        self.rows
            .iter()
            .filter_map(|r| r.category_volume(category))
            .fold(U256::ZERO, |acc, c| acc.saturating_add(c.volume()))
    }
}

// ============================================================================
// SALES ANALYZER
// ============================================================================

/// Aggregates sales into a destination set, attributed by origin label
pub struct SalesAnalyzer {
    destinations: DestinationSet,
    max_depth: usize,
}

impl SalesAnalyzer {
    pub fn new(destinations: DestinationSet) -> Self {
        Self {
            destinations,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Bound the backward origin search
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn destinations(&self) -> &DestinationSet {
        &self.destinations
    }

    /// Build the sales report for a ledger snapshot
    ///
    /// Each transaction into the destination set is counted once, whichever
    /// record it is seen under first. The ledger walk is address-ordered,
    /// so reports over the same snapshot are identical.
    pub fn analyze(&self, ledger: &TransferLedger, registry: &LabelRegistry) -> SalesReport {
        let mut rows: Vec<SellerRow> = Vec::new();
        let mut row_index: HashMap<Address, usize> = HashMap::new();
        let mut seen_hashes: HashSet<B256> = HashSet::new();
        let mut unresolved = UnresolvedVolume::default();

        for (address, record) in ledger.records() {
            for transfer in record.outbound() {
                let Some(category_index) =
                    self.destinations.category_index(&transfer.counterparty())
                else {
                    continue;
                };
                if !seen_hashes.insert(transfer.tx_hash()) {
                    continue;
                }

                match resolve_origin(ledger, registry, *address, self.max_depth) {
                    Some(origin) => {
                        let index = match row_index.get(&origin.address()) {
                            Some(&index) => index,
                            None => {
                                rows.push(SellerRow::new(
                                    origin.address(),
                                    origin.label().to_string(),
                                    self.destinations.categories(),
                                ));
                                row_index.insert(origin.address(), rows.len() - 1);
                                rows.len() - 1
                            }
                        };
                        rows[index].accumulate(category_index, transfer.amount());
                    }
                    None => {
                        unresolved.volume = unresolved.volume.saturating_add(transfer.amount());
                        unresolved.transfers += 1;
                    }
                }
            }
        }

        rows.sort_by(|a, b| b.total.cmp(&a.total));

        SalesReport {
            categories: self.destinations.categories().to_vec(),
            rows,
            unresolved,
        }
    }
}
