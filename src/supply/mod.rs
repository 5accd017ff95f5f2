// Supply module - WHO HOLDS WHAT
//
// Circulating supply accounting and holder breakdowns over a ledger
// snapshot.

mod report;

pub use report::{Holder, HolderGroup, SupplyParams, SupplyReport};
