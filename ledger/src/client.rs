//! The ledger client consumed by the storage node.

use netmapd_types::{Netmap, NodeInfo, NodeState, PublicKey};

use crate::LedgerError;

/// Remote netmap contract operations.
///
/// Every call is a synchronous round-trip that may fail. Implementations
/// are shared between the startup flow, the event flow and the control
/// surface, so they must be safe to call concurrently.
pub trait LedgerClient: Send + Sync {
    /// Current epoch number.
    fn epoch(&self) -> Result<u64, LedgerError>;

    /// Membership snapshot as of `epoch`.
    fn netmap_by_epoch(&self, epoch: u64) -> Result<Netmap, LedgerError>;

    /// Announce (or re-announce) a peer.
    fn add_peer(&self, info: &NodeInfo) -> Result<(), LedgerError>;

    /// Change the published state of the peer identified by `key`.
    fn update_peer_state(&self, key: &PublicKey, state: NodeState) -> Result<(), LedgerError>;
}

impl<T: LedgerClient + ?Sized> LedgerClient for std::sync::Arc<T> {
    fn epoch(&self) -> Result<u64, LedgerError> {
        (**self).epoch()
    }

    fn netmap_by_epoch(&self, epoch: u64) -> Result<Netmap, LedgerError> {
        (**self).netmap_by_epoch(epoch)
    }

    fn add_peer(&self, info: &NodeInfo) -> Result<(), LedgerError> {
        (**self).add_peer(info)
    }

    fn update_peer_state(&self, key: &PublicKey, state: NodeState) -> Result<(), LedgerError> {
        (**self).update_peer_state(key, state)
    }
}
