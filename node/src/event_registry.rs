//! Subscription table: per event tag, one parser and an ordered handler list.

use std::collections::HashMap;

use netmapd_ledger::StackItem;

use crate::event::{parse_add_peer, parse_update_peer_state, Event, EventError, EventType};

/// Decodes a notification payload into a typed event.
pub type Parser = Box<dyn Fn(&[StackItem]) -> Result<Event, EventError> + Send + Sync>;

/// Reacts to a decoded event. Handlers own their failure policy: they log
/// and return, nothing propagates back to the dispatcher.
pub type Handler = Box<dyn Fn(&Event) + Send + Sync>;

/// Built once during wiring, then moved into the
/// [`EventDispatcher`](crate::dispatcher::EventDispatcher). Registration after
/// delivery has started is not possible by construction.
#[derive(Default)]
pub struct EventRegistry {
    parsers: HashMap<EventType, Parser>,
    handlers: HashMap<EventType, Vec<Handler>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `tag`; handlers run in registration order.
    pub fn register_handler(&mut self, tag: EventType, handler: Handler) {
        self.handlers.entry(tag).or_default().push(handler);
    }

    /// Set the parser for `tag`, replacing any earlier one.
    pub fn register_parser(&mut self, tag: EventType, parser: Parser) {
        if self.parsers.insert(tag.clone(), parser).is_some() {
            tracing::debug!(event = %tag, "replaced notification parser");
        }
    }

    pub fn parser(&self, tag: &EventType) -> Option<&Parser> {
        self.parsers.get(tag)
    }

    pub fn handlers(&self, tag: &EventType) -> &[Handler] {
        self.handlers.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn handler_count(&self, tag: &EventType) -> usize {
        self.handlers(tag).len()
    }
}

/// Decode peer announcements and state updates. No handler is attached, so
/// these notifications are parsed and then discarded unless the caller
/// subscribes to them.
pub fn register_peer_parsers(registry: &mut EventRegistry) {
    registry.register_parser(EventType::add_peer(), Box::new(parse_add_peer));
    registry.register_parser(EventType::update_peer_state(), Box::new(parse_update_peer_state));
}
