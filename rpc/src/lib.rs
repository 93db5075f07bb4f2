//! HTTP server for the storage node's netmap surfaces.
//!
//! Provides endpoints for:
//! - Local node info (descriptor, current status, current epoch)
//! - Administrative netmap status changes (online / offline)
//! - Prometheus metrics

pub mod control;
pub mod error;
pub mod handlers;
pub mod server;

pub use control::{ControlError, NetmapControl};
pub use error::RpcError;
pub use server::{router, RpcServer, RpcState};
