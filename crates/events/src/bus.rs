//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use provision_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// Something that happened to a provisioned entity.
///
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_entity`](PlatformEvent::with_entity),
/// [`with_command`](PlatformEvent::with_command) and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"repo.created"`.
    pub event_type: String,

    pub entity_kind: Option<String>,

    pub entity_id: Option<DbId>,

    /// Command that caused the event, e.g. `"create-repo"`.
    pub command: Option<String>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create an event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity_kind: None,
            entity_id: None,
            command: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_entity(mut self, kind: impl Into<String>, id: DbId) -> Self {
        self.entity_kind = Some(kind.into());
        self.entity_id = Some(id);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use provision_events::bus::{EventBus, PlatformEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PlatformEvent::new("repo.created"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no active subscribers the event is dropped.
    pub fn publish(&self, event: PlatformEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
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

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(
            PlatformEvent::new("repo.created")
                .with_entity("repo", 42)
                .with_command("create-repo")
                .with_payload(serde_json::json!({"name": "centos"})),
        );

        for rx in [&mut rx1, &mut rx2] {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.event_type, "repo.created");
            assert_eq!(received.entity_kind.as_deref(), Some("repo"));
            assert_eq!(received.entity_id, Some(42));
            assert_eq!(received.command.as_deref(), Some("create-repo"));
            assert_eq!(received.payload["name"], "centos");
        }
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        bus.publish(PlatformEvent::new("repo.created"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn new_event_has_empty_object_payload() {
        let event = PlatformEvent::new("tag.matched");
        assert!(event.entity_kind.is_none());
        assert_eq!(event.payload, serde_json::json!({}));
    }
}
