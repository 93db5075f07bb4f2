//! Nullable infrastructure for deterministic testing.
//!
//! The ledger is the node's only external dependency. [`NullLedger`] stands
//! in for it in tests:
//! - Returns scripted epochs and snapshots
//! - Fails chosen operations on demand
//! - Records every call for assertions
//!
//! Usage: hand an `Arc<NullLedger>` to the node wherever a
//! `LedgerClient` is expected.

pub mod ledger;

pub use ledger::{LedgerCall, LedgerOp, NullLedger};
