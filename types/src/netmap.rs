//! Epoch-scoped netmap snapshots.

use serde::{Deserialize, Serialize};

use crate::{NodeInfo, PublicKey};

/// The ledger's view of cluster membership as of a specific epoch.
///
/// Snapshots are immutable; a new epoch always means a new snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netmap {
    pub epoch: u64,
    pub nodes: Vec<NodeInfo>,
}

impl Netmap {
    pub fn new(epoch: u64, nodes: Vec<NodeInfo>) -> Self {
        Self { epoch, nodes }
    }

    /// Locate the entry whose public key equals `key` (byte comparison).
    pub fn find_node(&self, key: &PublicKey) -> Option<&NodeInfo> {
        self.nodes
            .iter()
            .find(|n| n.public_key.as_bytes() == key.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeState;

    fn node(key: u8, state: NodeState) -> NodeInfo {
        NodeInfo::new(format!("/ip4/10.0.0.{key}/tcp/8080"), PublicKey::new(vec![key; 33]).unwrap())
            .with_state(state)
    }

    #[test]
    fn finds_node_by_public_key() {
        let nm = Netmap::new(3, vec![node(1, NodeState::Online), node(2, NodeState::Offline)]);
        let found = nm.find_node(&PublicKey::new(vec![2; 33]).unwrap()).unwrap();
        assert_eq!(found.state, NodeState::Offline);
    }

    #[test]
    fn missing_node_returns_none() {
        let nm = Netmap::new(3, vec![node(1, NodeState::Online)]);
        assert!(nm.find_node(&PublicKey::new(vec![9; 33]).unwrap()).is_none());
    }

    #[test]
    fn empty_snapshot() {
        let nm = Netmap::default();
        assert!(nm.is_empty());
        assert_eq!(nm.epoch, 0);
    }
}
