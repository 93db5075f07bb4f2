//! Notification delivery loop.
//!
//! Pulls notifications from the event source and hands each one to the
//! dispatcher on the blocking pool, waiting for it to finish before taking
//! the next. Deliveries are therefore serialized: handlers of a later
//! notification never start before those of an earlier one complete.

use std::sync::Arc;

use netmapd_ledger::Notification;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::dispatcher::EventDispatcher;

pub struct EventListener {
    dispatcher: Arc<EventDispatcher>,
}

impl EventListener {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Deliver notifications until shutdown is signalled or the source closes.
    pub async fn run(
        self,
        mut notifications: broadcast::Receiver<Notification>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("notification listener started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                received = notifications.recv() => match received {
                    Ok(notification) => self.deliver(notification).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "notification listener lagged behind the source");
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("notification source closed");
                        break;
                    }
                },
            }
        }

        tracing::info!("notification listener stopped");
    }

    async fn deliver(&self, notification: Notification) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let event_type = notification.event_type.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || dispatcher.dispatch(&notification)).await
        {
            tracing::error!(event = %event_type, error = %e, "notification dispatch aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{parse_new_epoch, Event, EventType};
    use crate::event_registry::EventRegistry;
    use std::sync::Mutex;

    fn recording_dispatcher(seen: &Arc<Mutex<Vec<u64>>>) -> Arc<EventDispatcher> {
        let mut reg = EventRegistry::new();
        reg.register_parser(EventType::new_epoch(), Box::new(parse_new_epoch));
        let seen = Arc::clone(seen);
        reg.register_handler(
            EventType::new_epoch(),
            Box::new(move |event| {
                if let Event::NewEpoch(ev) = event {
                    seen.lock().unwrap().push(ev.epoch);
                }
            }),
        );
        Arc::new(EventDispatcher::new(reg))
    }

    #[tokio::test]
    async fn delivers_in_order_until_source_closes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = broadcast::channel(16);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        for epoch in 1..=5 {
            tx.send(Notification::new_epoch(epoch)).unwrap();
        }
        drop(tx);

        EventListener::new(recording_dispatcher(&seen))
            .run(rx, shutdown_rx)
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (_tx, rx) = broadcast::channel::<Notification>(16);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(
            EventListener::new(recording_dispatcher(&seen)).run(rx, shutdown_rx),
        );
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("listener should stop")
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }
}
