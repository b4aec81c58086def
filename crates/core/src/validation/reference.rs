//! Lookup capability used by the `references` check.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::import::Entity;

/// Something that can tell whether an entity with `key == value` exists.
///
/// The `references` check calls [`lookup`](ReferenceStore::lookup) with the
/// attribute's own name as `key`; wrap a store in [`KeyedBy`] when the
/// referenced entity stores the value under a different field.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn lookup(&self, key: &str, value: &Value) -> Result<Option<Entity>, StoreError>;
}

/// Rewrites the lookup key before delegating.
pub struct KeyedBy {
    inner: Arc<dyn ReferenceStore>,
    field: String,
}

impl KeyedBy {
    pub fn new(inner: Arc<dyn ReferenceStore>, field: impl Into<String>) -> Self {
        Self {
            inner,
            field: field.into(),
        }
    }

    /// Convenience for building a `references` check argument.
    pub fn shared(inner: Arc<dyn ReferenceStore>, field: impl Into<String>) -> Arc<dyn ReferenceStore> {
        Arc::new(Self::new(inner, field))
    }
}

#[async_trait]
impl ReferenceStore for KeyedBy {
    async fn lookup(&self, _key: &str, value: &Value) -> Result<Option<Entity>, StoreError> {
        self.inner.lookup(&self.field, value).await
    }
}

/// Named reference stores, for schemas declared as JSON documents.
#[derive(Default, Clone)]
pub struct ReferenceRegistry {
    stores: HashMap<String, Arc<dyn ReferenceStore>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, store: Arc<dyn ReferenceStore>) {
        self.stores.insert(name.into(), store);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ReferenceStore>> {
        self.stores.get(name).cloned()
    }
}
