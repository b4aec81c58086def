//! Registered commands: one schema and one import resolver per command.

use std::collections::BTreeMap;
use std::sync::Arc;

use provision_core::error::SchemaError;
use provision_core::import::{ImportHook, ImportResolver, NaturalKey};
use provision_core::validation::{AttributeSpec, KeyedBy, ReferenceRegistry, Schema};
use serde::Serialize;
use serde_json::{json, Value};

use crate::stores::StoreProvider;

/// What a command validates against and how its payload is applied.
pub struct CommandDefinition {
    pub schema: Arc<Schema>,
    pub resolver: Arc<ImportResolver>,
}

/// Listing entry for `GET /api/v1/commands`.
#[derive(Debug, Serialize)]
pub struct CommandSummary {
    pub name: String,
    pub kind: String,
    pub natural_key: Vec<String>,
    pub attributes: Vec<Value>,
}

/// Command name to definition, ordered by name.
#[derive(Default)]
pub struct CommandCatalog {
    commands: BTreeMap<String, CommandDefinition>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its schema's command name.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), SchemaError> {
        let name = definition.schema.command().to_string();
        if self.commands.contains_key(&name) {
            return Err(SchemaError::new(format!("command {name} is already registered")));
        }
        self.commands.insert(name, definition);
        Ok(())
    }

    pub fn get(&self, command: &str) -> Option<&CommandDefinition> {
        self.commands.get(command)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn describe(&self) -> Vec<CommandSummary> {
        self.commands
            .iter()
            .map(|(name, definition)| CommandSummary {
                name: name.clone(),
                kind: definition.resolver.kind().to_string(),
                natural_key: definition.resolver.natural_key().attributes().to_vec(),
                attributes: definition
                    .schema
                    .attributes()
                    .iter()
                    .map(AttributeSpec::describe)
                    .collect(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Standard commands
// ---------------------------------------------------------------------------

/// `(command, entity kind, schema document)` for every standard command.
fn standard_documents() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        (
            "create-repo",
            "repo",
            json!({"attributes": [
                {"name": "name", "required": true, "type": "string"},
                {"name": "url", "type": "url", "exclude": "iso-url"},
                {"name": "iso-url", "type": "url", "exclude": "url"},
                {"name": "task", "type": "string"}
            ]}),
        ),
        (
            "create-broker",
            "broker",
            json!({"attributes": [
                {"name": "name", "required": true, "type": "string"},
                {"name": "broker-type", "required": true, "type": "string",
                 "one_of": ["noop", "puppet", "puppet-pe", "chef"]},
                {"name": "configuration", "type": "object"}
            ]}),
        ),
        (
            "create-tag",
            "tag",
            json!({"attributes": [
                {"name": "name", "required": true, "type": "string"},
                {"name": "rule", "required": true, "type": "array"}
            ]}),
        ),
        (
            "create-policy",
            "policy",
            json!({"attributes": [
                {"name": "name", "required": true, "type": "string"},
                {"name": "repo", "required": true, "type": "string", "references": "repos"},
                {"name": "broker", "required": true, "type": "string", "references": "brokers"},
                {"name": "task", "type": "string"},
                {"name": "hostname", "type": "string", "also": "root-password"},
                {"name": "root-password", "type": "string"},
                {"name": "enabled", "type": "boolean"},
                {"name": "max-count", "type": ["integer", null]},
                {"name": "tags", "type": "array"}
            ]}),
        ),
    ]
}

/// `(reference name, entity kind)` for every collection a standard schema
/// can point at with `references`.
const STANDARD_REFERENCES: &[(&str, &str)] = &[("repos", "repo"), ("brokers", "broker")];

/// Build the standard catalog over `stores`, running `hooks` after every
/// successful import.
///
/// Every standard command identifies its entity by `name`.
pub fn standard(
    stores: &dyn StoreProvider,
    hooks: &[Arc<dyn ImportHook>],
) -> Result<CommandCatalog, SchemaError> {
    let mut references = ReferenceRegistry::new();
    for &(name, kind) in STANDARD_REFERENCES {
        references.register(name, KeyedBy::shared(stores.reference_store(kind), "name"));
    }

    let mut catalog = CommandCatalog::new();
    for (command, kind, document) in standard_documents() {
        let schema = Schema::from_json(command, &document, &references)?;
        let resolver = hooks.iter().fold(
            ImportResolver::new(stores.identity_store(kind), NaturalKey::new(["name"])?),
            |resolver, hook| resolver.with_hook(Arc::clone(hook)),
        );
        catalog.register(CommandDefinition {
            schema: Arc::new(schema),
            resolver: Arc::new(resolver),
        })?;
        tracing::debug!(command, kind, "Registered command");
    }
    Ok(catalog)
}
