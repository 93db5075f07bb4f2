//! Raw contract notifications.

use serde::{Deserialize, Serialize};

/// Notification name emitted when the ledger moves to a new epoch.
pub const NEW_EPOCH: &str = "NewEpoch";
/// Notification name emitted when a peer announces itself.
pub const ADD_PEER: &str = "AddPeer";
/// Notification name emitted when a peer's state changes.
pub const UPDATE_STATE: &str = "UpdateState";

/// One item of a notification payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackItem {
    Integer(i128),
    ByteArray(Vec<u8>),
}

/// A contract notification as delivered by the event source: a name plus
/// an untyped item list. Decoding into typed events is the job of the
/// parsers registered by subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: String,
    pub items: Vec<StackItem>,
}

impl Notification {
    pub fn new(event_type: impl Into<String>, items: Vec<StackItem>) -> Self {
        Self {
            event_type: event_type.into(),
            items,
        }
    }

    pub fn new_epoch(epoch: u64) -> Self {
        Self::new(NEW_EPOCH, vec![StackItem::Integer(epoch.into())])
    }
}
