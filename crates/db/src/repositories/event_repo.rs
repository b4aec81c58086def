//! Repository for the `events` table.

use provision_core::types::DbId;
use sqlx::PgPool;

use crate::models::event::Event;

/// Column list for `events` queries.
const EVENT_COLUMNS: &str =
    "id, event_type, entity_kind, entity_id, command, payload, created_at";

/// Provides read/write operations for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event row, returning the generated ID.
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        entity_kind: Option<&str>,
        entity_id: Option<DbId>,
        command: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events (event_type, entity_kind, entity_id, command, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(entity_kind)
        .bind(entity_id)
        .bind(command)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// List the events recorded for one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_kind: &str,
        entity_id: DbId,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE entity_kind = $1 AND entity_id = $2 \
             ORDER BY id"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(entity_kind)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }

    /// List recent events ordered newest-first.
    pub async fn list_recent(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
