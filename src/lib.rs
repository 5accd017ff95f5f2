// tokentrail - ERC20 transfer ledger with provenance tracing
//
// Ingests Transfer events into a per-address ledger, persists snapshots,
// and answers provenance questions over the recorded history: where did
// these tokens come from, which labeled wallets sold into which venues,
// and how much supply actually circulates.

pub mod labels;
pub mod ledger;
pub mod sales;
pub mod scan;
pub mod storage;
pub mod supply;
pub mod trace;
