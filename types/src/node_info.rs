//! Node descriptor as published in the netmap.

use serde::{Deserialize, Serialize};

use crate::{NodeAttribute, NodeState, PublicKey};

/// Descriptor of a storage node.
///
/// The public key is the node's identity and never changes during the
/// lifetime of a process; `state` is the only field expected to change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Network address other nodes should use to reach this node.
    pub address: String,
    pub public_key: PublicKey,
    #[serde(default)]
    pub attributes: Vec<NodeAttribute>,
    #[serde(default)]
    pub state: NodeState,
}

impl NodeInfo {
    pub fn new(address: impl Into<String>, public_key: PublicKey) -> Self {
        Self {
            address: address.into(),
            public_key,
            attributes: Vec::new(),
            state: NodeState::Unspecified,
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<NodeAttribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Copy of this descriptor carrying `state`.
    pub fn with_state(&self, state: NodeState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Value of the attribute named `key`, if present.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}
