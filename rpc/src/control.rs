//! The contract the HTTP surface relies on.

use netmapd_types::{NetmapStatus, NodeInfo};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("unsupported netmap status: {0}")]
    UnsupportedStatus(NetmapStatus),

    #[error("{0}")]
    Failed(String),
}

/// Node-side operations exposed over HTTP. Implemented by the node.
///
/// `set_netmap_status` performs a blocking ledger round-trip; callers on an
/// async runtime must move it off the reactor.
pub trait NetmapControl: Send + Sync {
    /// Local descriptor carrying the node's current status.
    fn local_node_info(&self) -> NodeInfo;

    /// Last epoch observed by the node.
    fn current_epoch(&self) -> u64;

    fn set_netmap_status(&self, status: NetmapStatus) -> Result<(), ControlError>;
}
