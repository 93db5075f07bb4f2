//! The local node's descriptor and its externally visible status.

use netmapd_types::{NodeInfo, NodeState, PublicKey};
use tokio::sync::watch;

/// Local descriptor built once from configuration plus the node's status
/// as last resolved from a netmap snapshot.
///
/// Address, key and attributes never change after construction. The status
/// starts as `Offline` and is only replaced by snapshot entries; consumers
/// can follow it through [`LocalNode::subscribe_status`].
pub struct LocalNode {
    info: NodeInfo,
    status: watch::Sender<NodeState>,
}

impl LocalNode {
    pub fn new(info: NodeInfo) -> Self {
        let (status, _) = watch::channel(NodeState::Offline);
        Self {
            info: info.with_state(NodeState::Offline),
            status,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.info.public_key
    }

    pub fn status(&self) -> NodeState {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<NodeState> {
        self.status.subscribe()
    }

    /// Descriptor carrying the current status.
    pub fn descriptor(&self) -> NodeInfo {
        self.info.with_state(self.status())
    }

    /// Descriptor marked `Online`, as sent in bootstrap transactions.
    pub fn online_descriptor(&self) -> NodeInfo {
        self.info.with_state(NodeState::Online)
    }

    /// Adopt the state of the local entry found in a snapshot.
    ///
    /// `None` (the node is absent from the snapshot) leaves the status
    /// untouched. Returns the new status when one was applied.
    pub fn handle_node_info(&self, entry: Option<&NodeInfo>) -> Option<NodeState> {
        let entry = entry?;
        let state = entry.state;
        self.status.send_replace(state);
        Some(state)
    }
}
