//! Delivers decoded notifications to subscribed handlers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use netmapd_ledger::Notification;

use crate::event::{EventError, EventType};
use crate::event_registry::EventRegistry;
use crate::metrics::NodeMetrics;
use crate::tracing_spans::dispatch_span;

/// What happened to a single notification.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No parser is registered for the tag.
    Dropped,
    /// The parser refused the payload; no handler ran.
    Rejected(EventError),
    /// The event was decoded and offered to `handlers` handlers.
    Delivered { handlers: usize },
}

pub struct EventDispatcher {
    registry: EventRegistry,
    metrics: Option<Arc<NodeMetrics>>,
}

impl EventDispatcher {
    pub fn new(registry: EventRegistry) -> Self {
        Self {
            registry,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<NodeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Decode `notification` with its tag's parser and run every handler for
    /// the tag, sequentially and in registration order.
    ///
    /// A panicking handler is logged and the remaining handlers still run.
    pub fn dispatch(&self, notification: &Notification) -> DispatchOutcome {
        let tag = EventType::from_name(&notification.event_type);
        let _span = dispatch_span(tag.as_str()).entered();

        let Some(parser) = self.registry.parser(&tag) else {
            tracing::debug!("no parser registered, notification ignored");
            if let Some(m) = &self.metrics {
                m.events_dropped.inc();
            }
            return DispatchOutcome::Dropped;
        };

        let event = match parser(&notification.items) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "could not parse notification");
                if let Some(m) = &self.metrics {
                    m.events_rejected.inc();
                }
                return DispatchOutcome::Rejected(e);
            }
        };

        let handlers = self.registry.handlers(&tag);
        if handlers.is_empty() {
            return DispatchOutcome::Delivered { handlers: 0 };
        }

        for (index, handler) in handlers.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
                tracing::error!(handler = index, "notification handler panicked");
            }
        }

        if let Some(m) = &self.metrics {
            m.events_dispatched.inc();
        }
        DispatchOutcome::Delivered {
            handlers: handlers.len(),
        }
    }
}
