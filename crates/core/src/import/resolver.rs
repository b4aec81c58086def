//! Create-or-match-or-conflict resolution against an [`IdentityStore`].

use std::sync::Arc;

use super::compare::mismatched_fields;
use super::{
    friendly_name, CommandContext, IdentityStore, ImportHook, ImportOutcome, Imported, NaturalKey,
};
use crate::error::{CoreError, StoreError};
use crate::types::Payload;

/// Applies validated payloads to one entity kind.
///
/// The store's natural-key uniqueness constraint is the only serialization
/// point: no lock is held and existence is never checked up front. Under a
/// race exactly one submission inserts, and every other one falls into the
/// refetch-and-compare path.
pub struct ImportResolver {
    store: Arc<dyn IdentityStore>,
    natural_key: NaturalKey,
    hooks: Vec<Arc<dyn ImportHook>>,
}

impl ImportResolver {
    pub fn new(store: Arc<dyn IdentityStore>, natural_key: NaturalKey) -> Self {
        Self {
            store,
            natural_key,
            hooks: Vec::new(),
        }
    }

    /// Add follow-up work that runs after every successful import.
    pub fn with_hook(mut self, hook: Arc<dyn ImportHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn kind(&self) -> &str {
        self.store.kind()
    }

    pub fn natural_key(&self) -> &NaturalKey {
        &self.natural_key
    }

    /// Import `payload`, returning the created or the identical existing entity.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Validation`] if a natural key attribute is missing.
    /// - [`CoreError::Conflict`] if an entity with the same natural key exists
    ///   and differs in any populated field, including fields present on only
    ///   one side.
    /// - [`CoreError::Storage`] for any other store failure, unchanged. A
    ///   matching entity that disappears between the failed insert and the
    ///   refetch is reported as [`StoreError::NotFound`]; nothing is retried.
    pub async fn import(
        &self,
        payload: &Payload,
        context: &CommandContext,
    ) -> Result<Imported, CoreError> {
        let imported = self.resolve(payload).await?;

        for hook in &self.hooks {
            hook.after_import(&imported, context);
        }

        Ok(imported)
    }

    async fn resolve(&self, payload: &Payload) -> Result<Imported, CoreError> {
        let key = self.natural_key.extract(payload)?;

        match self.store.create_if_absent(&key, payload).await {
            Ok(entity) => {
                tracing::info!(
                    kind = self.kind(),
                    entity_id = entity.id,
                    key = %NaturalKey::render(&key),
                    "Entity created"
                );
                return Ok(Imported {
                    entity,
                    outcome: ImportOutcome::Created,
                });
            }
            Err(StoreError::UniqueViolation { constraint }) => {
                tracing::debug!(
                    kind = self.kind(),
                    constraint = %constraint,
                    key = %NaturalKey::render(&key),
                    "Natural key already taken, comparing with stored entity"
                );
            }
            Err(other) => return Err(other.into()),
        }

        let existing = self
            .store
            .fetch_by_natural_key(&key)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "{} {} vanished after a uniqueness violation",
                    friendly_name(self.kind()),
                    NaturalKey::render(&key)
                ))
            })?;

        let mismatches = mismatched_fields(&existing.fields, payload);
        if mismatches.is_empty() {
            tracing::debug!(kind = self.kind(), entity_id = existing.id, "Identical entity matched");
            return Ok(Imported {
                entity: existing,
                outcome: ImportOutcome::Matched,
            });
        }

        let fields: Vec<&str> = mismatches.iter().map(|m| m.field.as_str()).collect();
        tracing::warn!(
            kind = self.kind(),
            entity_id = existing.id,
            fields = ?fields,
            "Import conflicts with stored entity"
        );
        Err(CoreError::Conflict(format!(
            "The {} {} already exists with different attributes: {}",
            friendly_name(self.kind()),
            NaturalKey::render(&key),
            fields.join(", ")
        )))
    }
}
