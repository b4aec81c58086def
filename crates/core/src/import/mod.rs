//! Idempotent application of validated commands.
//!
//! [`ImportResolver`] turns a validated payload into a persisted [`Entity`]
//! with create-or-match-or-conflict semantics keyed on a [`NaturalKey`]:
//! resubmitting an identical command returns the existing entity, while a
//! divergent resubmission is rejected instead of overwriting it.

pub mod compare;
pub mod resolver;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{SchemaError, StoreError, ValidationFailure};
use crate::types::{DbId, Payload, Timestamp};

pub use compare::mismatched_fields;
pub use resolver::ImportResolver;

// ---------------------------------------------------------------------------
// Entities and keys
// ---------------------------------------------------------------------------

/// A persisted entity as seen by the import engine.
///
/// `fields` holds only command-level attributes; store-managed columns
/// (`id`, timestamps) live beside it and never take part in comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: DbId,
    pub kind: String,
    pub fields: Payload,
    pub created_at: Timestamp,
}

/// The attributes whose values jointly identify an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    attributes: Vec<String>,
}

impl NaturalKey {
    /// A natural key is fixed per entity kind at registration time, so an
    /// empty one is a configuration error.
    pub fn new<I, S>(attributes: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        if attributes.is_empty() {
            return Err(SchemaError::new("natural key needs at least one attribute"));
        }
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Project the key attributes out of `payload`.
    pub fn extract(&self, payload: &Payload) -> Result<Payload, ValidationFailure> {
        let mut key = Payload::new();
        for name in &self.attributes {
            let value = payload
                .get(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| {
                    ValidationFailure::new(format!("natural key attribute {name} is missing"))
                })?;
            key.insert(name.clone(), value.clone());
        }
        Ok(key)
    }

    /// Human-readable rendering of a projected key, e.g. `name=centos`.
    pub fn render(key: &Payload) -> String {
        key.iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Persistence capability consumed by [`ImportResolver`].
///
/// The store must enforce uniqueness of the natural key itself and report a
/// collision as [`StoreError::UniqueViolation`]; the resolver never
/// pre-checks existence.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Entity kind this store persists, e.g. `"repo"`.
    fn kind(&self) -> &str;

    async fn create_if_absent(&self, key: &Payload, fields: &Payload) -> Result<Entity, StoreError>;

    async fn fetch_by_natural_key(&self, key: &Payload) -> Result<Option<Entity>, StoreError>;
}

// ---------------------------------------------------------------------------
// Outcomes and hooks
// ---------------------------------------------------------------------------

/// The command an import is serving, passed through to hooks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandContext {
    pub command: String,
    pub params: Payload,
}

impl CommandContext {
    pub fn new(command: impl Into<String>, params: Payload) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    /// This call inserted the entity.
    Created,
    /// An identical entity already existed.
    Matched,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imported {
    pub entity: Entity,
    pub outcome: ImportOutcome,
}

/// Per-kind follow-up work run after a successful import.
///
/// Hooks see the decision but cannot change it; they run only once the
/// create-or-match step has succeeded.
pub trait ImportHook: Send + Sync {
    fn after_import(&self, imported: &Imported, context: &CommandContext);
}

/// `"PolicyTag"`, `"policy-tag"` or `"policy_tag"` to `"policy tag"`.
pub fn friendly_name(kind: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in kind.chars() {
        if ch == '-' || ch == '_' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if ch.is_uppercase() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.extend(ch.to_lowercase());
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join(" ")
}
