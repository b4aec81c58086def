use provision_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub event_type: String,
    pub entity_kind: Option<String>,
    pub entity_id: Option<DbId>,
    pub command: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
