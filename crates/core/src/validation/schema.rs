//! Ordered attribute schemas for one command kind.

use std::collections::HashMap;

use serde_json::Value;

use super::attribute::AttributeSpec;
use super::check::CheckArg;
use super::reference::ReferenceRegistry;
use crate::error::{CoreError, SchemaError};
use crate::types::Payload;

/// The attribute specifications of one command, in declaration order.
///
/// Only obtainable through [`SchemaBuilder::finalize`] or
/// [`Schema::from_json`], so every `Schema` has had its cross-attribute
/// references checked.
#[derive(Debug, Clone)]
pub struct Schema {
    command: String,
    attributes: Vec<AttributeSpec>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn builder(command: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(command)
    }

    /// Build a schema from a declarative document:
    ///
    /// ```json
    /// { "attributes": [
    ///     { "name": "name", "required": true, "type": "string" },
    ///     { "name": "repo", "type": "string", "references": "repos" }
    /// ] }
    /// ```
    ///
    /// `references` names a store registered in `references`.
    pub fn from_json(
        command: impl Into<String>,
        document: &Value,
        references: &ReferenceRegistry,
    ) -> Result<Self, SchemaError> {
        let command = command.into();
        let entries = document
            .get("attributes")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SchemaError::new(format!("schema {command} must have an attributes array"))
            })?;

        let mut builder = SchemaBuilder::new(command.clone());
        for entry in entries {
            let fields = entry.as_object().ok_or_else(|| {
                SchemaError::new(format!("schema {command}: attribute entries must be objects"))
            })?;
            let name = fields.get("name").and_then(Value::as_str).ok_or_else(|| {
                SchemaError::new(format!("schema {command}: attribute entry without a name"))
            })?;

            let mut checks = Vec::with_capacity(fields.len());
            for (check, config) in fields.iter().filter(|(key, _)| key.as_str() != "name") {
                let arg = match (check.as_str(), config) {
                    ("references", Value::String(store)) => {
                        CheckArg::Store(references.get(store).ok_or_else(|| {
                            SchemaError::new(format!(
                                "attribute {name}: unknown reference store {store}"
                            ))
                        })?)
                    }
                    _ => CheckArg::Json(config.clone()),
                };
                checks.push((check.as_str(), arg));
            }
            builder = builder.attr(name, checks)?;
        }

        builder.finalize()
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.index.get(name).map(|&i| &self.attributes[i])
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    /// Validate `payload` against every declared attribute in order.
    ///
    /// The first failing attribute wins. Keys of `payload` that no attribute
    /// declares are not inspected.
    pub async fn validate(&self, payload: &Payload) -> Result<(), CoreError> {
        for attribute in &self.attributes {
            attribute.validate(payload).await?;
        }
        Ok(())
    }
}

/// Free-function form of [`Schema::validate`].
pub async fn validate(schema: &Schema, payload: &Payload) -> Result<(), CoreError> {
    schema.validate(payload).await
}

/// Accumulates attributes for a [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            schema: Schema {
                command: command.into(),
                attributes: Vec::new(),
                index: HashMap::new(),
            },
        }
    }

    /// Declare an attribute. See [`AttributeSpec::new`].
    pub fn attr<I, K>(self, name: &str, checks: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, CheckArg)>,
        K: AsRef<str>,
    {
        let spec = AttributeSpec::new(name, checks)?;
        self.add(spec)
    }

    pub fn add(mut self, spec: AttributeSpec) -> Result<Self, SchemaError> {
        if self.schema.index.contains_key(spec.name()) {
            return Err(SchemaError::new(format!(
                "attribute {} is already defined in {}",
                spec.name(),
                self.schema.command
            )));
        }
        self.schema
            .index
            .insert(spec.name().to_string(), self.schema.attributes.len());
        self.schema.attributes.push(spec);
        Ok(self)
    }

    /// Cross-check every attribute against the complete attribute set.
    pub fn finalize(self) -> Result<Schema, SchemaError> {
        for attribute in &self.schema.attributes {
            attribute.finalize(&self.schema)?;
        }
        Ok(self.schema)
    }
}
