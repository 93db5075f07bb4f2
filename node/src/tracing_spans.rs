//! Pre-built [`tracing::Span`] constructors for netmap operations.
//!
//! Using consistent span names and field sets makes it easy to filter and
//! correlate the logs of one notification or one epoch across handlers.

use tracing::{info_span, Span};

/// Span covering delivery of one notification to its handlers.
pub fn dispatch_span(event_type: &str) -> Span {
    info_span!("dispatch", event = %event_type)
}

/// Span covering the reactions to a single new epoch.
pub fn epoch_span(epoch: u64) -> Span {
    info_span!("new_epoch", epoch)
}

/// Span covering one administrative operation.
pub fn control_span(action: &str) -> Span {
    info_span!("control", action = %action)
}
