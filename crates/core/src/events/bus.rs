use tokio::sync::broadcast;

use super::types::CatalogEvent;

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of catalog events to in-process listeners.
///
/// Mutations never wait on listeners. A listener that falls more than
/// `capacity` events behind sees `RecvError::Lagged` and skips ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver `event` to every current listener and return how many there
    /// were. Events published while nobody listens are discarded.
    pub fn emit(&self, event: CatalogEvent) -> usize {
        let kind = event.kind();
        let blueprint_id = event.blueprint_id();
        match self.sender.send(event) {
            Ok(listeners) => {
                tracing::debug!(kind, blueprint_id, listeners, "catalog event");
                listeners
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{EntryEvent, RevisionEvent};
    use chrono::Utc;
    use tokio::sync::broadcast::error::RecvError;

    fn deleted(id: i64) -> CatalogEvent {
        CatalogEvent::EntryDeleted(EntryEvent {
            blueprint_id: id,
            user_id: 7,
            timestamp: Utc::now(),
        })
    }

    fn rendered(id: i64, revision: i64) -> CatalogEvent {
        CatalogEvent::RevisionRendered(RevisionEvent {
            blueprint_id: id,
            revision_id: 100 + revision,
            revision,
            checksum: "ab".repeat(32),
            timestamp: Utc::now(),
        })
    }

    #[tokio::test]
    async fn every_listener_sees_every_event() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(rendered(4, 2)), 2);

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.kind(), "revisionRendered");
            assert_eq!(event.blueprint_id(), 4);
        }
    }

    #[test]
    fn nobody_listening_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.emit(deleted(3)), 0);
    }

    #[tokio::test]
    async fn slow_listener_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for id in 0..4 {
            bus.emit(deleted(id));
        }
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().blueprint_id(), 2);
    }
}
