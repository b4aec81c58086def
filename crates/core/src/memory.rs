//! In-memory reference implementation of the store contracts.
//!
//! Deterministic and test-friendly. Production deployments use the
//! PostgreSQL-backed store in `provision-db`.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::error::StoreError;
use crate::import::{Entity, IdentityStore};
use crate::types::{DbId, Payload};
use crate::validation::ReferenceStore;

#[derive(Default)]
struct Inner {
    next_id: DbId,
    entities: Vec<Entity>,
    by_key: HashMap<String, usize>,
}

/// In-memory store for one entity kind.
///
/// Natural-key uniqueness is enforced under a single write lock, so racing
/// inserts behave like a database unique constraint: one wins, the rest get
/// [`StoreError::UniqueViolation`].
pub struct MemoryStore {
    kind: String,
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Insert an entity directly, keyed by all of its fields.
    ///
    /// Intended for seeding reference data.
    pub fn insert(&self, fields: Payload) -> Result<Entity, StoreError> {
        let key = fields.clone();
        self.insert_keyed(&key, &fields)
    }

    pub fn get(&self, id: DbId) -> Option<Entity> {
        let guard = self.inner.read().ok()?;
        guard.entities.iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|g| g.entities.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_keyed(&self, key: &Payload, fields: &Payload) -> Result<Entity, StoreError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| StoreError::Backend(format!("{} store lock poisoned", self.kind)))?;

        let key = key_string(key);
        if guard.by_key.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: format!("uq_{}_natural_key", self.kind),
            });
        }

        guard.next_id += 1;
        let entity = Entity {
            id: guard.next_id,
            kind: self.kind.clone(),
            fields: fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            created_at: Utc::now(),
        };
        let position = guard.entities.len();
        guard.entities.push(entity.clone());
        guard.by_key.insert(key, position);
        Ok(entity)
    }
}

/// Canonical string form of a key; `Payload` iterates in key order.
fn key_string(key: &Payload) -> String {
    Value::Object(key.clone()).to_string()
}

#[async_trait]
impl IdentityStore for MemoryStore {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn create_if_absent(&self, key: &Payload, fields: &Payload) -> Result<Entity, StoreError> {
        self.insert_keyed(key, fields)
    }

    async fn fetch_by_natural_key(&self, key: &Payload) -> Result<Option<Entity>, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend(format!("{} store lock poisoned", self.kind)))?;
        Ok(guard
            .by_key
            .get(&key_string(key))
            .map(|&i| guard.entities[i].clone()))
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn lookup(&self, key: &str, value: &Value) -> Result<Option<Entity>, StoreError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend(format!("{} store lock poisoned", self.kind)))?;
        Ok(guard
            .entities
            .iter()
            .find(|e| e.fields.get(key) == Some(value))
            .cloned())
    }
}
