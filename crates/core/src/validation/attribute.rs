//! A single named attribute of a command and the checks it must satisfy.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use super::check::{build_check, render_literal, AttributeCheck, CheckArg, TypeCandidate};
use super::schema::Schema;
use crate::error::{CoreError, SchemaError, ValidationFailure};
use crate::types::{json_type_name, Payload};

static ATTRIBUTE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[-a-z0-9]+\z").expect("valid regex"));

/// One attribute of a command schema.
///
/// Immutable once built. Checks are kept sorted by evaluation order:
/// presence, exclusion, co-requirement, type, reference, enumeration.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    name: String,
    checks: Vec<AttributeCheck>,
}

impl AttributeSpec {
    /// Build an attribute from `(check name, configuration)` pairs.
    ///
    /// Every configuration problem is reported here: an invalid name, an
    /// unknown check, a check given twice, or a check whose configuration has
    /// the wrong shape.
    pub fn new<I, K>(name: &str, checks: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, CheckArg)>,
        K: AsRef<str>,
    {
        if !ATTRIBUTE_NAME_RE.is_match(name) {
            return Err(SchemaError::new(format!("attribute name {name:?} is not valid")));
        }

        let mut built: Vec<AttributeCheck> = Vec::new();
        for (check, arg) in checks {
            let check = check.as_ref();
            let result = build_check(check, arg).ok_or_else(|| {
                SchemaError::new(format!(
                    "attribute {name} does not know how to perform a {check} check"
                ))
            })?;
            let built_check =
                result.map_err(|e| SchemaError::new(format!("attribute {name}: {}", e.0)))?;

            if built.iter().any(|c| c.check_name() == built_check.check_name()) {
                return Err(SchemaError::new(format!(
                    "attribute {name} configures the {check} check more than once"
                )));
            }
            built.push(built_check);
        }
        built.sort_by_key(AttributeCheck::rank);

        Ok(Self {
            name: name.to_string(),
            checks: built,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checks(&self) -> &[AttributeCheck] {
        &self.checks
    }

    pub fn is_required(&self) -> bool {
        self.checks
            .iter()
            .any(|c| matches!(c, AttributeCheck::Required(true)))
    }

    /// Confirm every attribute this one names is declared in `schema`.
    pub fn finalize(&self, schema: &Schema) -> Result<(), SchemaError> {
        for check in &self.checks {
            match check {
                AttributeCheck::Exclude(names) => {
                    for other in names {
                        if schema.attribute(other).is_none() {
                            return Err(SchemaError::new(format!(
                                "excluded attribute {other} by {} is not defined in the schema",
                                self.name
                            )));
                        }
                    }
                }
                AttributeCheck::Also(names) => {
                    for other in names {
                        if schema.attribute(other).is_none() {
                            return Err(SchemaError::new(format!(
                                "additionally required attribute {other} by {} is not defined in the schema",
                                self.name
                            )));
                        }
                    }
                }
                AttributeCheck::References(_) => {
                    if schema.attribute(&self.name).is_none() {
                        return Err(SchemaError::new(format!(
                            "referenced key attribute {} is not defined in the schema",
                            self.name
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check this attribute against `payload`, stopping at the first failure.
    ///
    /// Returns [`CoreError::Validation`] for a failed check and
    /// [`CoreError::Storage`] if the reference store itself failed.
    pub async fn validate(&self, payload: &Payload) -> Result<(), CoreError> {
        let Some(value) = payload.get(&self.name) else {
            if self.is_required() {
                return Err(self.fail(format!("required attribute {} is missing", self.name)));
            }
            return Ok(());
        };

        for check in &self.checks {
            match check {
                AttributeCheck::Required(_) => {}
                AttributeCheck::Exclude(names) => {
                    if let Some(other) = names.iter().find(|n| payload.contains_key(n.as_str())) {
                        return Err(self.fail(format!(
                            "if {} is present, {other} must not be present",
                            self.name
                        )));
                    }
                }
                AttributeCheck::Also(names) => {
                    if names.iter().any(|n| !payload.contains_key(n.as_str())) {
                        return Err(self.fail(format!(
                            "if {} is present, {} must also be present",
                            self.name,
                            names.join(", ")
                        )));
                    }
                }
                AttributeCheck::Type(candidates) => self.check_type(candidates, value)?,
                AttributeCheck::References(store) => {
                    if store.lookup(&self.name, value).await?.is_none() {
                        return Err(ValidationFailure::not_found(format!(
                            "attribute {} must refer to an existing instance",
                            self.name
                        ))
                        .into());
                    }
                }
                AttributeCheck::OneOf(allowed) => {
                    if !allowed.contains(value) {
                        let valid: Vec<String> = allowed.iter().map(render_literal).collect();
                        return Err(self.fail(format!(
                            "attribute {} must refer to one of {}",
                            self.name,
                            valid.join(", ")
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn check_type(&self, candidates: &[TypeCandidate], value: &Value) -> Result<(), CoreError> {
        // The first candidate whose base type matches decides; a failing
        // refinement does not fall through to later candidates.
        if let Some(candidate) = candidates.iter().find(|c| c.base().matches(value)) {
            return candidate.refine(value).map_err(|error| {
                self.fail(format!(
                    "attribute {} fails type checking for {}: {error}",
                    self.name,
                    candidate.base().name()
                ))
            });
        }

        let expected: Vec<&str> = candidates.iter().map(|c| c.base().name()).collect();
        let message = if expected.len() == 1 {
            format!(
                "attribute {} has wrong type {} where {} was expected",
                self.name,
                json_type_name(value),
                expected[0]
            )
        } else {
            format!(
                "attribute {} has wrong type {} where one of {} was expected",
                self.name,
                json_type_name(value),
                expected.join(", ")
            )
        };
        Err(self.fail(message))
    }

    fn fail(&self, message: String) -> CoreError {
        CoreError::Validation(ValidationFailure::new(message))
    }

    /// JSON summary of the attribute, for listing command schemas.
    pub fn describe(&self) -> Value {
        let mut out = serde_json::Map::new();
        out.insert("name".into(), json!(self.name));
        for check in &self.checks {
            let described = match check {
                AttributeCheck::Required(is) => json!(is),
                AttributeCheck::Type(candidates) => {
                    json!(candidates.iter().map(|c| c.base().name()).collect::<Vec<_>>())
                }
                AttributeCheck::Exclude(names) | AttributeCheck::Also(names) => json!(names),
                AttributeCheck::References(_) => json!(true),
                AttributeCheck::OneOf(values) => json!(values),
            };
            out.insert(check.check_name().into(), described);
        }
        Value::Object(out)
    }
}
