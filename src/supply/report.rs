// Supply Reporting - circulating supply and holder breakdown
//
// Pure accounting over a ledger snapshot: burned, locked and circulating
// totals, a ranked holder list, and holders grouped by normalized label.

use crate::labels::LabelRegistry;
use crate::ledger::{TransferLedger, BURN_ADDRESS};
use alloy_primitives::{Address, U256, U512};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed token parameters the ledger cannot know by itself
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyParams {
    total_supply: U256,
}

impl SupplyParams {
    pub fn new(total_supply: U256) -> Self {
        Self { total_supply }
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }
}

/// One address holding a positive balance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    address: Address,
    label: Option<String>,
    balance: U256,
}

impl Holder {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Original label of the address, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn balance(&self) -> U256 {
        self.balance
    }
}

/// Holders grouped under a normalized label
///
/// `None` is the pool of unlabeled addresses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderGroup {
    name: Option<String>,
    balance: U256,
    addresses: Vec<Address>,
}

impl HolderGroup {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn balance(&self) -> U256 {
        self.balance
    }

    /// Member addresses in ledger walk order
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn holder_count(&self) -> usize {
        self.addresses.len()
    }
}

/// Supply breakdown over one ledger snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SupplyReport {
    total_supply: U256,
    burned: U256,
    locked: U256,
    circulating: U256,
    holders: Vec<Holder>,
    groups: Vec<HolderGroup>,
}

impl SupplyReport {
    /// Build the report from the ledger and label registry
    ///
    /// Overdrawn and zero balances are skipped. The burn address feeds the
    /// burned total and is excluded from the holder list. Custodial
    /// balances count as locked but their holders stay listed.
    pub fn build(
        ledger: &TransferLedger,
        registry: &LabelRegistry,
        params: &SupplyParams,
    ) -> Self {
        let mut burned = U256::ZERO;
        let mut locked = U256::ZERO;
        let mut holders: Vec<Holder> = Vec::new();
        let mut group_index: HashMap<Option<String>, usize> = HashMap::new();
        let mut group_rows: Vec<HolderGroup> = Vec::new();

        for (address, record) in ledger.records() {
            if record.is_overdrawn() {
                continue;
            }
            let balance = record.balance();
            if balance.is_zero() {
                continue;
            }
            if *address == BURN_ADDRESS {
                burned = burned.saturating_add(balance);
                continue;
            }

            let label = registry.get(address);
            if label.map(|l| l.is_custodial()).unwrap_or(false) {
                locked = locked.saturating_add(balance);
            }

            let name = label.map(|l| l.name().to_string());
            let group_name = name.as_deref().map(|n| registry.base_name(n));

            holders.push(Holder {
                address: *address,
                label: name,
                balance,
            });

            let index = match group_index.get(&group_name) {
                Some(&index) => index,
                None => {
                    group_rows.push(HolderGroup {
                        name: group_name.clone(),
                        balance: U256::ZERO,
                        addresses: Vec::new(),
                    });
                    group_index.insert(group_name, group_rows.len() - 1);
                    group_rows.len() - 1
                }
            };
            group_rows[index].balance = group_rows[index].balance.saturating_add(balance);
            group_rows[index].addresses.push(*address);
        }

        holders.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.address.cmp(&b.address))
        });
        group_rows.sort_by(|a, b| {
            b.balance
                .cmp(&a.balance)
                .then_with(|| a.name.cmp(&b.name))
        });

        let circulating = params
            .total_supply
            .saturating_sub(locked)
            .saturating_sub(burned);

        Self {
            total_supply: params.total_supply,
            burned,
            locked,
            circulating,
            holders,
            groups: group_rows,
        }
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Balance sitting at the burn address
    pub fn burned(&self) -> U256 {
        self.burned
    }

    /// Combined balance of custodial-labeled holders
    pub fn locked(&self) -> U256 {
        self.locked
    }

    /// Total supply minus locked minus burned, saturating at zero
    pub fn circulating(&self) -> U256 {
        self.circulating
    }

    /// Holders sorted by balance descending, ties by address ascending
    pub fn holders(&self) -> &[Holder] {
        &self.holders
    }

    /// Groups sorted by balance descending; unlabeled pool under `None`
    pub fn groups(&self) -> &[HolderGroup] {
        &self.groups
    }

    /// Share of total supply as a display percentage, two-decimal precision
    pub fn percent_of_supply(&self, amount: U256) -> f64 {
        if self.total_supply.is_zero() {
            return 0.0;
        }
        let scaled =
            U512::from(amount) * U512::from(10_000u64) / U512::from(self.total_supply);
        let basis_points = u64::try_from(scaled).unwrap_or(u64::MAX);
        basis_points as f64 / 100.0
    }
}
