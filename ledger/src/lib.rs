//! Netmap ledger boundary.
//!
//! The netmap is maintained by a ledger-side contract. This crate defines the
//! narrow interface the storage node consumes ([`LedgerClient`]), the raw
//! notification format the contract emits ([`Notification`]), and
//! [`MemoryLedger`], an in-process emulation of the contract used by dev
//! networks.

pub mod client;
pub mod error;
pub mod memory;
pub mod notification;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use notification::{Notification, StackItem};
