//! Typed netmap events and the parsers that decode them from notifications.
//!
//! A parser runs once per notification and produces an [`Event`]; every
//! handler subscribed to the same tag receives that typed value.

use std::fmt;

use netmapd_ledger::notification::{ADD_PEER, NEW_EPOCH, UPDATE_STATE};
use netmapd_ledger::StackItem;
use netmapd_types::{NodeInfo, NodeState, PublicKey};
use thiserror::Error;

/// Tag identifying a class of notifications.
///
/// Derived from the notification's canonical name, so the same name always
/// yields the same tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventType(String);

impl EventType {
    pub fn from_name(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn new_epoch() -> Self {
        Self::from_name(NEW_EPOCH)
    }

    pub fn add_peer() -> Self {
        Self::from_name(ADD_PEER)
    }

    pub fn update_peer_state() -> Self {
        Self::from_name(UPDATE_STATE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ledger moved to a new epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewEpoch {
    pub epoch: u64,
}

/// A peer announced itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddPeer {
    pub node: NodeInfo,
}

/// A peer's published state changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatePeerState {
    pub public_key: PublicKey,
    pub state: NodeState,
}

/// Decoded netmap events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    NewEpoch(NewEpoch),
    AddPeer(AddPeer),
    UpdatePeerState(UpdatePeerState),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("wrong number of notification items: expected {expected}, got {got}")]
    WrongItemCount { expected: usize, got: usize },

    #[error("notification item {index} is not {expected}")]
    WrongItemType {
        index: usize,
        expected: &'static str,
    },

    #[error("notification item {index} out of range: {value}")]
    OutOfRange { index: usize, value: i128 },

    #[error("could not decode notification: {0}")]
    Decode(String),
}

fn expect_items(items: &[StackItem], expected: usize) -> Result<(), EventError> {
    if items.len() != expected {
        return Err(EventError::WrongItemCount {
            expected,
            got: items.len(),
        });
    }
    Ok(())
}

fn integer(items: &[StackItem], index: usize) -> Result<i128, EventError> {
    match &items[index] {
        StackItem::Integer(v) => Ok(*v),
        _ => Err(EventError::WrongItemType {
            index,
            expected: "an integer",
        }),
    }
}

fn bytes(items: &[StackItem], index: usize) -> Result<&[u8], EventError> {
    match &items[index] {
        StackItem::ByteArray(b) => Ok(b),
        _ => Err(EventError::WrongItemType {
            index,
            expected: "a byte array",
        }),
    }
}

/// `NewEpoch[epoch]`
pub fn parse_new_epoch(items: &[StackItem]) -> Result<Event, EventError> {
    expect_items(items, 1)?;
    let raw = integer(items, 0)?;
    let epoch = u64::try_from(raw).map_err(|_| EventError::OutOfRange {
        index: 0,
        value: raw,
    })?;
    Ok(Event::NewEpoch(NewEpoch { epoch }))
}

/// `AddPeer[node_info]`
pub fn parse_add_peer(items: &[StackItem]) -> Result<Event, EventError> {
    expect_items(items, 1)?;
    let node: NodeInfo =
        serde_json::from_slice(bytes(items, 0)?).map_err(|e| EventError::Decode(e.to_string()))?;
    Ok(Event::AddPeer(AddPeer { node }))
}

/// `UpdateState[state, public_key]`
pub fn parse_update_peer_state(items: &[StackItem]) -> Result<Event, EventError> {
    expect_items(items, 2)?;
    let raw = integer(items, 0)?;
    let code = u32::try_from(raw).map_err(|_| EventError::OutOfRange {
        index: 0,
        value: raw,
    })?;
    let public_key = PublicKey::new(bytes(items, 1)?.to_vec())
        .map_err(|e| EventError::Decode(e.to_string()))?;
    Ok(Event::UpdatePeerState(UpdatePeerState {
        public_key,
        state: NodeState::from_code(code),
    }))
}
