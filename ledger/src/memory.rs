//! In-memory netmap contract for dev networks.
//!
//! Mirrors the contract's bookkeeping closely enough for a single process
//! to run a node end to end: peers announce themselves as candidates,
//! candidates become the next epoch's netmap when the epoch ticks, and
//! every mutation is broadcast as a [`Notification`].

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use netmapd_types::{Netmap, NodeInfo, NodeState, PublicKey};
use tokio::sync::broadcast;

use crate::notification::{ADD_PEER, UPDATE_STATE};
use crate::{LedgerClient, LedgerError, Notification, StackItem};

/// Number of past snapshots retained; older epochs answer `SnapshotNotFound`.
const SNAPSHOT_HISTORY: usize = 64;

const NOTIFICATION_CAPACITY: usize = 256;

struct Inner {
    epoch: u64,
    /// Peers to include in the next snapshot, in announcement order.
    candidates: Vec<NodeInfo>,
    snapshots: BTreeMap<u64, Netmap>,
}

pub struct MemoryLedger {
    inner: Mutex<Inner>,
    notifications: broadcast::Sender<Notification>,
}

impl MemoryLedger {
    /// Start at epoch 0 with an empty netmap.
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let mut snapshots = BTreeMap::new();
        snapshots.insert(0, Netmap::new(0, Vec::new()));
        Self {
            inner: Mutex::new(Inner {
                epoch: 0,
                candidates: Vec::new(),
                snapshots,
            }),
            notifications,
        }
    }

    /// Receiver for every notification emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Close the current epoch: snapshot the candidate list into the next
    /// epoch's netmap and emit `NewEpoch`. Returns the new epoch number.
    pub fn new_epoch(&self) -> u64 {
        let epoch = {
            let mut inner = self.lock();
            inner.epoch += 1;
            let epoch = inner.epoch;
            let snapshot = Netmap::new(epoch, inner.candidates.clone());
            inner.snapshots.insert(epoch, snapshot);
            while inner.snapshots.len() > SNAPSHOT_HISTORY {
                inner.snapshots.pop_first();
            }
            epoch
        };

        tracing::debug!(epoch, "dev ledger: new epoch");
        self.emit(Notification::new_epoch(epoch));
        epoch
    }

    /// Public keys of the current candidates.
    pub fn candidate_keys(&self) -> HashSet<PublicKey> {
        self.lock()
            .candidates
            .iter()
            .map(|c| c.public_key.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, notification: Notification) {
        // No subscribers is fine: nobody is listening yet.
        let _ = self.notifications.send(notification);
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerClient for MemoryLedger {
    fn epoch(&self) -> Result<u64, LedgerError> {
        Ok(self.lock().epoch)
    }

    fn netmap_by_epoch(&self, epoch: u64) -> Result<Netmap, LedgerError> {
        self.lock()
            .snapshots
            .get(&epoch)
            .cloned()
            .ok_or(LedgerError::SnapshotNotFound(epoch))
    }

    fn add_peer(&self, info: &NodeInfo) -> Result<(), LedgerError> {
        let encoded =
            serde_json::to_vec(info).map_err(|e| LedgerError::Rejected(e.to_string()))?;

        {
            let mut inner = self.lock();
            match inner
                .candidates
                .iter_mut()
                .find(|c| c.public_key == info.public_key)
            {
                Some(existing) => *existing = info.clone(),
                None => inner.candidates.push(info.clone()),
            }
        }

        self.emit(Notification::new(ADD_PEER, vec![StackItem::ByteArray(encoded)]));
        Ok(())
    }

    fn update_peer_state(&self, key: &PublicKey, state: NodeState) -> Result<(), LedgerError> {
        {
            let mut inner = self.lock();
            let position = inner
                .candidates
                .iter()
                .position(|c| &c.public_key == key)
                .ok_or_else(|| LedgerError::PeerNotFound(key.to_hex()))?;

            if state == NodeState::Offline {
                inner.candidates.remove(position);
            } else {
                inner.candidates[position].state = state;
            }
        }

        self.emit(Notification::new(
            UPDATE_STATE,
            vec![
                StackItem::Integer(state.code().into()),
                StackItem::ByteArray(key.as_bytes().to_vec()),
            ],
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NEW_EPOCH;

    fn peer(id: u8) -> NodeInfo {
        NodeInfo::new(
            format!("/ip4/127.0.0.{id}/tcp/8080"),
            PublicKey::new(vec![id; 33]).unwrap(),
        )
        .with_state(NodeState::Online)
    }

    #[test]
    fn starts_at_epoch_zero_with_empty_netmap() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.epoch().unwrap(), 0);
        assert!(ledger.netmap_by_epoch(0).unwrap().is_empty());
    }

    #[test]
    fn candidates_enter_the_next_snapshot() {
        let ledger = MemoryLedger::new();
        ledger.add_peer(&peer(1)).unwrap();

        assert!(ledger.netmap_by_epoch(0).unwrap().is_empty());
        let epoch = ledger.new_epoch();
        assert_eq!(epoch, 1);

        let nm = ledger.netmap_by_epoch(1).unwrap();
        assert_eq!(nm.epoch, 1);
        assert_eq!(nm.len(), 1);
    }

    #[test]
    fn re_announcement_replaces_candidate() {
        let ledger = MemoryLedger::new();
        ledger.add_peer(&peer(1)).unwrap();
        ledger.add_peer(&peer(1)).unwrap();
        assert_eq!(ledger.candidate_keys().len(), 1);
    }

    #[test]
    fn going_offline_removes_candidate() {
        let ledger = MemoryLedger::new();
        let p = peer(1);
        ledger.add_peer(&p).unwrap();
        ledger
            .update_peer_state(&p.public_key, NodeState::Offline)
            .unwrap();
        ledger.new_epoch();
        assert!(ledger.netmap_by_epoch(1).unwrap().find_node(&p.public_key).is_none());
    }

    #[test]
    fn unknown_peer_state_update_fails() {
        let ledger = MemoryLedger::new();
        let key = PublicKey::new(vec![7; 33]).unwrap();
        assert!(matches!(
            ledger.update_peer_state(&key, NodeState::Offline),
            Err(LedgerError::PeerNotFound(_))
        ));
    }

    #[test]
    fn old_snapshots_are_evicted() {
        let ledger = MemoryLedger::new();
        for _ in 0..(SNAPSHOT_HISTORY + 1) {
            ledger.new_epoch();
        }
        assert_eq!(
            ledger.netmap_by_epoch(0),
            Err(LedgerError::SnapshotNotFound(0))
        );
        assert!(ledger.netmap_by_epoch(SNAPSHOT_HISTORY as u64 + 1).is_ok());
    }

    #[tokio::test]
    async fn new_epoch_is_broadcast() {
        let ledger = MemoryLedger::new();
        let mut rx = ledger.subscribe();
        ledger.new_epoch();

        let n = rx.recv().await.unwrap();
        assert_eq!(n.event_type, NEW_EPOCH);
        assert_eq!(n.items, vec![StackItem::Integer(1)]);
    }
}
