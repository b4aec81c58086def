use provision_core::import::Entity;
use provision_core::types::{DbId, Payload, Timestamp};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// A row from the `entities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityRow {
    pub id: DbId,
    pub kind: String,
    pub natural_key: Value,
    pub fields: Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        let fields = match row.fields {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        Entity {
            id: row.id,
            kind: row.kind,
            fields,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn row_converts_to_entity_without_store_columns() {
        let now = Utc::now();
        let entity: Entity = EntityRow {
            id: 7,
            kind: "repo".into(),
            natural_key: json!({"name": "centos"}),
            fields: json!({"name": "centos", "url": "http://mirror"}),
            created_at: now,
            updated_at: now,
        }
        .into();

        assert_eq!(entity.id, 7);
        assert_eq!(entity.kind, "repo");
        assert_eq!(entity.fields.len(), 2);
        assert!(!entity.fields.contains_key("updated_at"));
    }
}
