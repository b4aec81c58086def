//! Import hook that announces every successful import on the [`EventBus`].

use std::sync::Arc;

use provision_core::import::{CommandContext, ImportHook, ImportOutcome, Imported};

use crate::bus::{EventBus, PlatformEvent};

/// Publishes `"{kind}.created"` or `"{kind}.matched"` after each import.
///
/// The event payload is the entity's stored fields.
pub struct PublishOnImport {
    bus: Arc<EventBus>,
}

impl PublishOnImport {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl ImportHook for PublishOnImport {
    fn after_import(&self, imported: &Imported, context: &CommandContext) {
        let suffix = match imported.outcome {
            ImportOutcome::Created => "created",
            ImportOutcome::Matched => "matched",
        };
        let entity = &imported.entity;
        let event = PlatformEvent::new(format!("{}.{suffix}", entity.kind))
            .with_entity(entity.kind.clone(), entity.id)
            .with_command(context.command.clone())
            .with_payload(serde_json::Value::Object(entity.fields.clone()));

        tracing::debug!(event_type = %event.event_type, entity_id = entity.id, "Publishing import event");
        self.bus.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision_core::import::{ImportResolver, NaturalKey};
    use provision_core::memory::MemoryStore;
    use provision_core::types::Payload;
    use serde_json::json;

    #[tokio::test]
    async fn created_then_matched_events_are_published() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let resolver = ImportResolver::new(
            Arc::new(MemoryStore::new("repo")),
            NaturalKey::new(["name"]).unwrap(),
        )
        .with_hook(Arc::new(PublishOnImport::new(Arc::clone(&bus))));

        let data: Payload = json!({"name": "centos"}).as_object().cloned().unwrap();
        let ctx = CommandContext::new("create-repo", Payload::new());
        resolver.import(&data, &ctx).await.unwrap();
        resolver.import(&data, &ctx).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_type, "repo.created");
        assert_eq!(first.command.as_deref(), Some("create-repo"));
        assert_eq!(first.payload, json!({"name": "centos"}));

        let second = rx.recv().await.unwrap();
        assert_eq!(second.event_type, "repo.matched");
        assert_eq!(second.entity_id, first.entity_id);
    }

    #[tokio::test]
    async fn conflicts_publish_nothing() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let resolver = ImportResolver::new(
            Arc::new(MemoryStore::new("tag")),
            NaturalKey::new(["name"]).unwrap(),
        )
        .with_hook(Arc::new(PublishOnImport::new(Arc::clone(&bus))));
        let ctx = CommandContext::new("create-tag", Payload::new());

        let a: Payload = json!({"name": "small", "rule": 1}).as_object().cloned().unwrap();
        let b: Payload = json!({"name": "small", "rule": 2}).as_object().cloned().unwrap();
        resolver.import(&a, &ctx).await.unwrap();
        assert!(resolver.import(&b, &ctx).await.is_err());

        assert_eq!(rx.recv().await.unwrap().event_type, "tag.created");
        assert!(rx.try_recv().is_err());
    }
}
