//! Fundamental types for netmap membership.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! node identities, node states, node descriptors and epoch-scoped netmap snapshots.

pub mod attribute;
pub mod error;
pub mod keys;
pub mod netmap;
pub mod node_info;
pub mod state;

pub use attribute::{parse_attributes, NodeAttribute};
pub use error::TypesError;
pub use keys::PublicKey;
pub use netmap::Netmap;
pub use node_info::NodeInfo;
pub use state::{NetmapStatus, NodeState};
