//! Store backends the command catalog can be built on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use provision_core::import::IdentityStore;
use provision_core::memory::MemoryStore;
use provision_core::validation::ReferenceStore;
use provision_db::repositories::EntityRepo;
use provision_db::DbPool;

/// Hands out the identity and reference stores for an entity kind.
pub trait StoreProvider: Send + Sync {
    fn identity_store(&self, kind: &str) -> Arc<dyn IdentityStore>;

    fn reference_store(&self, kind: &str) -> Arc<dyn ReferenceStore>;
}

/// PostgreSQL-backed stores sharing one pool.
pub struct PgStores {
    pool: DbPool,
}

impl PgStores {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl StoreProvider for PgStores {
    fn identity_store(&self, kind: &str) -> Arc<dyn IdentityStore> {
        Arc::new(EntityRepo::new(self.pool.clone(), kind))
    }

    fn reference_store(&self, kind: &str) -> Arc<dyn ReferenceStore> {
        Arc::new(EntityRepo::new(self.pool.clone(), kind))
    }
}

/// In-process stores, one [`MemoryStore`] per kind, created on first use.
///
/// The identity and reference store of a kind are the same instance, so
/// entities imported through one command are visible to references from
/// another.
#[derive(Default)]
pub struct MemoryStores {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, kind: &str) -> Arc<MemoryStore> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            stores
                .entry(kind.to_string())
                .or_insert_with(|| Arc::new(MemoryStore::new(kind))),
        )
    }
}

impl StoreProvider for MemoryStores {
    fn identity_store(&self, kind: &str) -> Arc<dyn IdentityStore> {
        self.store(kind)
    }

    fn reference_store(&self, kind: &str) -> Arc<dyn ReferenceStore> {
        self.store(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_stores_share_one_instance_per_kind() {
        let stores = MemoryStores::new();
        assert!(Arc::ptr_eq(&stores.store("repo"), &stores.store("repo")));
        assert!(!Arc::ptr_eq(&stores.store("repo"), &stores.store("tag")));
        assert_eq!(stores.identity_store("broker").kind(), "broker");
    }
}
