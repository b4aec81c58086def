//! Runs against a fresh database provisioned by `sqlx::test` from `DATABASE_URL`.

use provision_db::repositories::EventRepo;
use provision_events::{EventBus, EventPersistence, PlatformEvent};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn published_events_are_written_until_the_bus_closes(pool: PgPool) {
    let bus = EventBus::default();
    let handle = tokio::spawn(EventPersistence::run(pool.clone(), bus.subscribe()));

    bus.publish(
        PlatformEvent::new("repo.created")
            .with_entity("repo", 1)
            .with_command("create-repo"),
    );
    bus.publish(PlatformEvent::new("repo.matched").with_entity("repo", 1));

    drop(bus);
    handle.await.unwrap();

    let events = EventRepo::list_for_entity(&pool, "repo", 1).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, "repo.created");
    assert_eq!(events[0].command.as_deref(), Some("create-repo"));
    assert_eq!(events[1].command, None);
}
