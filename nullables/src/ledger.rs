//! Nullable ledger: scripted answers, injected failures, recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use netmapd_ledger::{LedgerClient, LedgerError};
use netmapd_types::{Netmap, NodeInfo, NodeState, PublicKey};

/// Ledger operations that can be failed on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    Epoch,
    NetmapByEpoch,
    AddPeer,
    UpdatePeerState,
}

/// A call observed by the [`NullLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    Epoch,
    NetmapByEpoch(u64),
    AddPeer(NodeInfo),
    UpdatePeerState(PublicKey, NodeState),
}

/// A test ledger that answers from scripted state instead of a contract.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullLedger {
    epoch: Mutex<u64>,
    snapshots: Mutex<HashMap<u64, Netmap>>,
    failing: Mutex<HashSet<LedgerOp>>,
    calls: Mutex<Vec<LedgerCall>>,
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            epoch: Mutex::new(0),
            snapshots: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the epoch returned by `epoch()`.
    pub fn set_epoch(&self, epoch: u64) {
        *self.epoch.lock().unwrap() = epoch;
    }

    /// Script the snapshot returned for `netmap.epoch`.
    pub fn put_snapshot(&self, netmap: Netmap) {
        self.snapshots.lock().unwrap().insert(netmap.epoch, netmap);
    }

    /// Make every subsequent call of `op` fail until [`recover`] is called.
    ///
    /// [`recover`]: NullLedger::recover
    pub fn fail(&self, op: LedgerOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: LedgerOp) {
        self.failing.lock().unwrap().remove(&op);
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Descriptors passed to `add_peer`, in order.
    pub fn announced(&self) -> Vec<NodeInfo> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                LedgerCall::AddPeer(info) => Some(info.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(key, state)` pairs passed to `update_peer_state`, in order.
    pub fn state_updates(&self) -> Vec<(PublicKey, NodeState)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                LedgerCall::UpdatePeerState(key, state) => Some((key.clone(), *state)),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: LedgerCall, op: LedgerOp) -> Result<(), LedgerError> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(&op) {
            return Err(LedgerError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for NullLedger {
    fn epoch(&self) -> Result<u64, LedgerError> {
        self.record(LedgerCall::Epoch, LedgerOp::Epoch)?;
        Ok(*self.epoch.lock().unwrap())
    }

    fn netmap_by_epoch(&self, epoch: u64) -> Result<Netmap, LedgerError> {
        self.record(LedgerCall::NetmapByEpoch(epoch), LedgerOp::NetmapByEpoch)?;
        self.snapshots
            .lock()
            .unwrap()
            .get(&epoch)
            .cloned()
            .ok_or(LedgerError::SnapshotNotFound(epoch))
    }

    fn add_peer(&self, info: &NodeInfo) -> Result<(), LedgerError> {
        self.record(LedgerCall::AddPeer(info.clone()), LedgerOp::AddPeer)
    }

    fn update_peer_state(&self, key: &PublicKey, state: NodeState) -> Result<(), LedgerError> {
        self.record(
            LedgerCall::UpdatePeerState(key.clone(), state),
            LedgerOp::UpdatePeerState,
        )
    }
}
