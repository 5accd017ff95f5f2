// Supply Report Tests
// Tests for circulating supply accounting and holder breakdowns

use alloy_primitives::{Address, B256, U256};
use tokentrail::labels::{Label, LabelRegistry};
use tokentrail::ledger::{TransferLedger, BURN_ADDRESS};
use tokentrail::supply::{SupplyParams, SupplyReport};

fn addr(n: u8) -> Address {
    Address::with_last_byte(n)
}

fn hash(n: u8) -> B256 {
    B256::with_last_byte(n)
}

fn ingest(ledger: &mut TransferLedger, from: Address, to: Address, amount: u64, block: u64, h: u8) {
    ledger
        .ingest_transfer(from, to, U256::from(amount), block, hash(h))
        .unwrap();
}

// ============================================================================
// SUPPLY TOTALS
// ============================================================================

#[test]
fn test_burned_locked_and_circulating() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(1), 1_000, 1, 1);
    ingest(&mut ledger, addr(1), addr(2), 300, 2, 2);
    ingest(&mut ledger, addr(2), BURN_ADDRESS, 50, 3, 3);

    let mut registry = LabelRegistry::new();
    registry.insert(addr(2), Label::custodial("Bridge custody"));

    let params = SupplyParams::new(U256::from(2_000));
    let report = SupplyReport::build(&ledger, &registry, &params);

    assert_eq!(report.total_supply(), U256::from(2_000));
    assert_eq!(report.burned(), U256::from(50));
    assert_eq!(report.locked(), U256::from(250));
    assert_eq!(report.circulating(), U256::from(1_700));
}

#[test]
fn test_circulating_saturates_at_zero() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(1), 500, 1, 1);

    let mut registry = LabelRegistry::new();
    registry.insert(addr(1), Label::custodial("Locked treasury"));

    // Locked exceeds the declared total supply.
    let params = SupplyParams::new(U256::from(100));
    let report = SupplyReport::build(&ledger, &registry, &params);

    assert_eq!(report.circulating(), U256::ZERO);
}

// ============================================================================
// HOLDER LIST
// ============================================================================

#[test]
fn test_holders_rank_by_balance_then_address() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(2), 100, 1, 1);
    ingest(&mut ledger, Address::ZERO, addr(1), 100, 2, 2);
    ingest(&mut ledger, Address::ZERO, addr(3), 400, 3, 3);

    let registry = LabelRegistry::new();
    let report = SupplyReport::build(&ledger, &registry, &SupplyParams::new(U256::from(600)));

    let ranked: Vec<Address> = report.holders().iter().map(|h| h.address()).collect();
    assert_eq!(ranked, vec![addr(3), addr(1), addr(2)]);
}

#[test]
fn test_holder_labels_are_attached() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(1), 100, 1, 1);

    let mut registry = LabelRegistry::new();
    registry.insert(addr(1), Label::new("Whale 1"));

    let report = SupplyReport::build(&ledger, &registry, &SupplyParams::new(U256::from(100)));

    assert_eq!(report.holders().len(), 1);
    assert_eq!(report.holders()[0].label(), Some("Whale 1"));
    assert_eq!(report.holders()[0].balance(), U256::from(100));
}

#[test]
fn test_zero_and_overdrawn_balances_are_excluded() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(1), 100, 1, 1);
    // addr(2) receives 50 and sends it all on; addr(4) only ever sends.
    ingest(&mut ledger, addr(1), addr(2), 50, 2, 2);
    ingest(&mut ledger, addr(2), addr(3), 50, 3, 3);
    ingest(&mut ledger, addr(4), addr(3), 25, 4, 4);

    let registry = LabelRegistry::new();
    let report = SupplyReport::build(&ledger, &registry, &SupplyParams::new(U256::from(100)));

    let listed: Vec<Address> = report.holders().iter().map(|h| h.address()).collect();
    assert!(!listed.contains(&addr(2)));
    assert!(!listed.contains(&addr(4)));
    assert!(listed.contains(&addr(1)));
    assert!(listed.contains(&addr(3)));
}

#[test]
fn test_burn_address_is_not_a_holder() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(1), 100, 1, 1);
    ingest(&mut ledger, addr(1), BURN_ADDRESS, 40, 2, 2);

    let registry = LabelRegistry::new();
    let report = SupplyReport::build(&ledger, &registry, &SupplyParams::new(U256::from(100)));

    assert_eq!(report.burned(), U256::from(40));
    let listed: Vec<Address> = report.holders().iter().map(|h| h.address()).collect();
    assert!(!listed.contains(&BURN_ADDRESS));
}

// ============================================================================
// LABEL GROUPS
// ============================================================================

#[test]
fn test_groups_pool_by_normalized_label() {
    let mut ledger = TransferLedger::new();
    ingest(&mut ledger, Address::ZERO, addr(1), 1_000, 1, 1);
    ingest(&mut ledger, addr(1), addr(2), 400, 2, 2);
    ingest(&mut ledger, addr(1), addr(3), 100, 3, 3);

    let mut registry = LabelRegistry::new();
    registry.insert(addr(1), Label::new("Vesting"));
    registry.insert(addr(2), Label::new("Vesting - tranche 2"));

    let report = SupplyReport::build(&ledger, &registry, &SupplyParams::new(U256::from(1_000)));

    assert_eq!(report.groups().len(), 2);

    let vesting = &report.groups()[0];
    assert_eq!(vesting.name(), Some("Vesting"));
    assert_eq!(vesting.balance(), U256::from(900));
    assert_eq!(vesting.holder_count(), 2);
    assert_eq!(vesting.addresses(), &[addr(1), addr(2)]);

    let unlabeled = &report.groups()[1];
    assert_eq!(unlabeled.name(), None);
    assert_eq!(unlabeled.balance(), U256::from(100));
}

// ============================================================================
// PERCENTAGES
// ============================================================================

#[test]
fn test_percent_of_supply() {
    let ledger = TransferLedger::new();
    let registry = LabelRegistry::new();
    let report = SupplyReport::build(&ledger, &registry, &SupplyParams::new(U256::from(10_000)));

    assert_eq!(report.percent_of_supply(U256::from(2_500)), 25.0);
    assert_eq!(report.percent_of_supply(U256::from(33)), 0.33);
    assert_eq!(report.percent_of_supply(U256::from(10_000)), 100.0);
}
