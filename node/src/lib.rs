//! Storage node netmap subsystem.
//!
//! Keeps the node's view of the network map in step with the ledger:
//! - Tracks the current epoch
//! - Decodes ledger notifications and dispatches them to subscribed handlers
//! - Re-announces the node periodically
//! - Reconciles the local status against each epoch's netmap snapshot
//! - Drives administrative online/offline transitions

pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod epoch_state;
pub mod error;
pub mod event;
pub mod event_registry;
pub mod listener;
pub mod local_node;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod reconciler;
pub mod shutdown;
pub mod tracing_spans;

pub use bootstrap::BootstrapController;
pub use config::NodeConfig;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use epoch_state::NetworkState;
pub use error::NodeError;
pub use event::{AddPeer, Event, EventError, EventType, NewEpoch, UpdatePeerState};
pub use event_registry::{register_peer_parsers, EventRegistry, Handler, Parser};
pub use listener::EventListener;
pub use local_node::LocalNode;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::StorageNode;
pub use reconciler::{MembershipReconciler, ReBootstrapPolicy};
pub use shutdown::ShutdownController;
