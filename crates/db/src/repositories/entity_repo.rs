//! Repository for the `entities` table.
//!
//! Every entity kind shares one table; rows are told apart by `kind` and the
//! `uq_entities_kind_natural_key` constraint enforces natural-key uniqueness
//! per kind.

use async_trait::async_trait;
use provision_core::error::StoreError;
use provision_core::import::{Entity, IdentityStore};
use provision_core::types::{DbId, Payload};
use provision_core::validation::ReferenceStore;
use serde_json::Value;

use crate::error::classify_store_error;
use crate::models::entity::EntityRow;
use crate::DbPool;

/// Column list for `entities` queries.
const COLUMNS: &str = "id, kind, natural_key, fields, created_at, updated_at";

/// Store for one entity kind backed by the `entities` table.
#[derive(Clone)]
pub struct EntityRepo {
    pool: DbPool,
    kind: String,
}

impl EntityRepo {
    pub fn new(pool: DbPool, kind: impl Into<String>) -> Self {
        Self {
            pool,
            kind: kind.into(),
        }
    }

    /// Find an entity of this kind by its ID.
    pub async fn find_by_id(&self, id: DbId) -> Result<Option<Entity>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM entities WHERE kind = $1 AND id = $2");
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&self.kind)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_store_error)?;
        Ok(row.map(Entity::from))
    }

    /// List entities of this kind, oldest first.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Entity>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM entities WHERE kind = $1 \
             ORDER BY id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&self.kind)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(classify_store_error)?;
        Ok(rows.into_iter().map(Entity::from).collect())
    }
}

/// Drop JSON `null` values; an explicit null is stored as an absent field.
fn populated(fields: &Payload) -> Value {
    Value::Object(
        fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

#[async_trait]
impl IdentityStore for EntityRepo {
    fn kind(&self) -> &str {
        &self.kind
    }

    /// Plain insert: a natural-key collision surfaces as
    /// [`StoreError::UniqueViolation`] instead of being absorbed by
    /// `ON CONFLICT`.
    async fn create_if_absent(&self, key: &Payload, fields: &Payload) -> Result<Entity, StoreError> {
        let query = format!(
            "INSERT INTO entities (kind, natural_key, fields) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&self.kind)
            .bind(Value::Object(key.clone()))
            .bind(populated(fields))
            .fetch_one(&self.pool)
            .await
            .map_err(classify_store_error)?;
        Ok(row.into())
    }

    async fn fetch_by_natural_key(&self, key: &Payload) -> Result<Option<Entity>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM entities WHERE kind = $1 AND natural_key = $2"
        );
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&self.kind)
            .bind(Value::Object(key.clone()))
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_store_error)?;
        Ok(row.map(Entity::from))
    }
}

#[async_trait]
impl ReferenceStore for EntityRepo {
    async fn lookup(&self, key: &str, value: &Value) -> Result<Option<Entity>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM entities \
             WHERE kind = $1 AND fields -> $2 = $3 \
             ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, EntityRow>(&query)
            .bind(&self.kind)
            .bind(key)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_store_error)?;
        Ok(row.map(Entity::from))
    }
}
