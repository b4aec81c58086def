//! The closed set of per-attribute checks and their construction table.
//!
//! Each check is configured from a [`CheckArg`] by a constructor looked up by
//! name in [`CHECKS`]. Constructors validate the shape of their configuration
//! eagerly, so a malformed schema fails when it is built rather than on the
//! first request that happens to exercise it.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::reference::ReferenceStore;
use crate::error::SchemaError;
use crate::types::json_type_name;

// ---------------------------------------------------------------------------
// Base types
// ---------------------------------------------------------------------------

/// JSON value kinds a `type` check can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    String,
    /// Any JSON number, integers included.
    Number,
    /// A number representable as `i64` or `u64`.
    Integer,
    Boolean,
    Null,
    Array,
    Object,
}

impl BaseType {
    /// Returns the type name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            BaseType::String => "string",
            BaseType::Number => "number",
            BaseType::Integer => "integer",
            BaseType::Boolean => "boolean",
            BaseType::Null => "null",
            BaseType::Array => "array",
            BaseType::Object => "object",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(BaseType::String),
            "number" => Some(BaseType::Number),
            "integer" => Some(BaseType::Integer),
            "boolean" => Some(BaseType::Boolean),
            "null" => Some(BaseType::Null),
            "array" => Some(BaseType::Array),
            "object" => Some(BaseType::Object),
            _ => None,
        }
    }

    /// Whether `value`'s runtime kind is assignable to this type.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            BaseType::String => value.is_string(),
            BaseType::Number => value.is_number(),
            BaseType::Integer => value.is_i64() || value.is_u64(),
            BaseType::Boolean => value.is_boolean(),
            BaseType::Null => value.is_null(),
            BaseType::Array => value.is_array(),
            BaseType::Object => value.is_object(),
        }
    }
}

// ---------------------------------------------------------------------------
// Type candidates
// ---------------------------------------------------------------------------

/// Extra constraint run only after a value already matched its base type.
pub type Refinement = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// One acceptable type for an attribute, optionally refined.
#[derive(Clone)]
pub struct TypeCandidate {
    base: BaseType,
    refinement: Option<Refinement>,
}

impl TypeCandidate {
    pub fn new(base: BaseType) -> Self {
        Self {
            base,
            refinement: None,
        }
    }

    pub fn refined<F>(base: BaseType, refinement: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            base,
            refinement: Some(Arc::new(refinement)),
        }
    }

    /// A string that must parse as a URI reference, absolute or relative.
    pub fn url() -> Self {
        Self::refined(BaseType::String, |value| {
            parse_uri_reference(value.as_str().unwrap_or_default())
        })
    }

    /// Resolve a type name from declarative configuration.
    ///
    /// Accepts every [`BaseType`] name plus `"url"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "url" => Some(Self::url()),
            other => BaseType::from_name(other).map(Self::new),
        }
    }

    pub fn base(&self) -> BaseType {
        self.base
    }

    /// Run the refinement, if any. Callers must check the base type first.
    pub fn refine(&self, value: &Value) -> Result<(), String> {
        match &self.refinement {
            Some(refinement) => refinement(value),
            None => Ok(()),
        }
    }
}

impl From<BaseType> for TypeCandidate {
    fn from(base: BaseType) -> Self {
        Self::new(base)
    }
}

/// Base that relative references are resolved against before parsing.
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// Characters the URL parser would silently percent-encode but which may not
/// appear unescaped in a URI reference.
fn is_disallowed_uri_char(c: char) -> bool {
    c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`')
}

fn parse_uri_reference(text: &str) -> Result<(), String> {
    if let Some(c) = text.chars().find(|c| is_disallowed_uri_char(*c)) {
        return Err(format!("invalid character {c:?}"));
    }
    match url::Url::parse(text) {
        Ok(_) => Ok(()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = url::Url::parse(RELATIVE_BASE).map_err(|e| e.to_string())?;
            url::Url::options()
                .base_url(Some(&base))
                .parse(text)
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    }
}

impl fmt::Debug for TypeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCandidate")
            .field("base", &self.base)
            .field("refined", &self.refinement.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// A single named constraint on one attribute.
#[derive(Clone)]
pub enum AttributeCheck {
    Required(bool),
    Type(Vec<TypeCandidate>),
    Exclude(Vec<String>),
    Also(Vec<String>),
    References(Arc<dyn ReferenceStore>),
    OneOf(Vec<Value>),
}

impl AttributeCheck {
    /// The configuration name this check is registered under.
    pub fn check_name(&self) -> &'static str {
        match self {
            AttributeCheck::Required(_) => "required",
            AttributeCheck::Type(_) => "type",
            AttributeCheck::Exclude(_) => "exclude",
            AttributeCheck::Also(_) => "also",
            AttributeCheck::References(_) => "references",
            AttributeCheck::OneOf(_) => "one_of",
        }
    }

    /// Position in the fixed evaluation order.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            AttributeCheck::Required(_) => 0,
            AttributeCheck::Exclude(_) => 1,
            AttributeCheck::Also(_) => 2,
            AttributeCheck::Type(_) => 3,
            AttributeCheck::References(_) => 4,
            AttributeCheck::OneOf(_) => 5,
        }
    }
}

impl fmt::Debug for AttributeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeCheck::Required(is) => f.debug_tuple("Required").field(is).finish(),
            AttributeCheck::Type(types) => f.debug_tuple("Type").field(types).finish(),
            AttributeCheck::Exclude(names) => f.debug_tuple("Exclude").field(names).finish(),
            AttributeCheck::Also(names) => f.debug_tuple("Also").field(names).finish(),
            AttributeCheck::References(_) => f.write_str("References(..)"),
            AttributeCheck::OneOf(values) => f.debug_tuple("OneOf").field(values).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration handed to a check constructor.
#[derive(Clone)]
pub enum CheckArg {
    Bool(bool),
    Json(Value),
    Types(Vec<TypeCandidate>),
    Store(Arc<dyn ReferenceStore>),
}

impl From<bool> for CheckArg {
    fn from(value: bool) -> Self {
        CheckArg::Bool(value)
    }
}

impl From<Value> for CheckArg {
    fn from(value: Value) -> Self {
        CheckArg::Json(value)
    }
}

impl From<&str> for CheckArg {
    fn from(value: &str) -> Self {
        CheckArg::Json(Value::String(value.to_string()))
    }
}

impl From<BaseType> for CheckArg {
    fn from(base: BaseType) -> Self {
        CheckArg::Types(vec![TypeCandidate::new(base)])
    }
}

impl From<TypeCandidate> for CheckArg {
    fn from(candidate: TypeCandidate) -> Self {
        CheckArg::Types(vec![candidate])
    }
}

impl From<Vec<TypeCandidate>> for CheckArg {
    fn from(candidates: Vec<TypeCandidate>) -> Self {
        CheckArg::Types(candidates)
    }
}

impl From<Arc<dyn ReferenceStore>> for CheckArg {
    fn from(store: Arc<dyn ReferenceStore>) -> Self {
        CheckArg::Store(store)
    }
}

impl CheckArg {
    fn kind_name(&self) -> &'static str {
        match self {
            CheckArg::Bool(_) => "boolean",
            CheckArg::Json(value) => json_type_name(value),
            CheckArg::Types(_) => "type list",
            CheckArg::Store(_) => "reference store",
        }
    }
}

type CheckBuilder = fn(CheckArg) -> Result<AttributeCheck, SchemaError>;

/// Check name to constructor. Adding a check means adding a variant and a row here.
const CHECKS: &[(&str, CheckBuilder)] = &[
    ("required", build_required),
    ("type", build_type),
    ("exclude", build_exclude),
    ("also", build_also),
    ("references", build_references),
    ("one_of", build_one_of),
];

/// Build the check registered as `name`, or `None` if no such check exists.
pub fn build_check(name: &str, arg: CheckArg) -> Option<Result<AttributeCheck, SchemaError>> {
    CHECKS
        .iter()
        .find(|(check, _)| *check == name)
        .map(|(_, build)| build(arg))
}

/// Names of every registered check.
pub fn check_names() -> impl Iterator<Item = &'static str> {
    CHECKS.iter().map(|(name, _)| *name)
}

fn build_required(arg: CheckArg) -> Result<AttributeCheck, SchemaError> {
    match arg {
        CheckArg::Bool(is) | CheckArg::Json(Value::Bool(is)) => Ok(AttributeCheck::Required(is)),
        other => Err(SchemaError::new(format!(
            "required takes a boolean, not a {}",
            other.kind_name()
        ))),
    }
}

fn build_type(arg: CheckArg) -> Result<AttributeCheck, SchemaError> {
    const SHAPE: &str = "type checks must be passed a type name, null, or a non-empty array of the same";

    let candidates = match arg {
        CheckArg::Types(candidates) => candidates,
        CheckArg::Json(Value::Array(names)) => names
            .iter()
            .map(type_from_json)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SchemaError::new(SHAPE))?,
        CheckArg::Json(single) => vec![type_from_json(&single).ok_or_else(|| SchemaError::new(SHAPE))?],
        _ => return Err(SchemaError::new(SHAPE)),
    };

    if candidates.is_empty() {
        return Err(SchemaError::new(SHAPE));
    }
    Ok(AttributeCheck::Type(candidates))
}

fn type_from_json(value: &Value) -> Option<TypeCandidate> {
    match value {
        Value::Null => Some(TypeCandidate::new(BaseType::Null)),
        Value::String(name) => TypeCandidate::from_name(name),
        _ => None,
    }
}

fn build_exclude(arg: CheckArg) -> Result<AttributeCheck, SchemaError> {
    names_from(arg, "attribute exclusions must be a string, or an array of strings")
        .map(AttributeCheck::Exclude)
}

fn build_also(arg: CheckArg) -> Result<AttributeCheck, SchemaError> {
    names_from(
        arg,
        "additional attribute requirements must be a string, or an array of strings",
    )
    .map(AttributeCheck::Also)
}

fn names_from(arg: CheckArg, shape: &str) -> Result<Vec<String>, SchemaError> {
    match arg {
        CheckArg::Json(Value::String(name)) => Ok(vec![name]),
        CheckArg::Json(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                _ => Err(SchemaError::new(shape)),
            })
            .collect(),
        _ => Err(SchemaError::new(shape)),
    }
}

fn build_references(arg: CheckArg) -> Result<AttributeCheck, SchemaError> {
    match arg {
        CheckArg::Store(store) => Ok(AttributeCheck::References(store)),
        _ => Err(SchemaError::new("attribute references must be a reference store")),
    }
}

fn build_one_of(arg: CheckArg) -> Result<AttributeCheck, SchemaError> {
    let values = match arg {
        CheckArg::Json(Value::Array(values)) => values,
        other => {
            return Err(SchemaError::new(format!(
                "one_of takes an array of options, not a {}",
                other.kind_name()
            )))
        }
    };

    if values.is_empty() {
        return Err(SchemaError::new("one_of takes a non-empty array of options"));
    }

    for value in &values {
        if matches!(value, Value::Array(_) | Value::Object(_)) {
            return Err(SchemaError::new(format!(
                "one_of values must be one of string, number, boolean, null, not {}",
                json_type_name(value)
            )));
        }
    }

    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(SchemaError::new("one_of contains duplicate values"));
        }
    }

    Ok(AttributeCheck::OneOf(values))
}

/// Render an allowed literal the way failure messages list it.
pub(crate) fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn build(name: &str, arg: impl Into<CheckArg>) -> Result<AttributeCheck, SchemaError> {
        build_check(name, arg.into()).expect("registered check")
    }

    #[test]
    fn unknown_check_is_not_registered() {
        assert!(build_check("minimum", CheckArg::Bool(true)).is_none());
        assert_eq!(
            check_names().collect::<Vec<_>>(),
            vec!["required", "type", "exclude", "also", "references", "one_of"]
        );
    }

    #[test]
    fn required_accepts_bool_and_json_bool() {
        assert_matches!(build("required", true), Ok(AttributeCheck::Required(true)));
        assert_matches!(build("required", json!(false)), Ok(AttributeCheck::Required(false)));
        assert!(build("required", json!("yes")).is_err());
    }

    #[test]
    fn type_accepts_names_null_and_lists() {
        assert_matches!(build("type", json!("string")), Ok(AttributeCheck::Type(t)) if t.len() == 1);
        assert_matches!(build("type", json!(null)), Ok(AttributeCheck::Type(t)) if t[0].base() == BaseType::Null);
        assert_matches!(
            build("type", json!(["integer", null])),
            Ok(AttributeCheck::Type(t)) if t.len() == 2
        );
        assert_matches!(build("type", BaseType::Object), Ok(AttributeCheck::Type(_)));
    }

    #[test]
    fn type_rejects_empty_and_unknown() {
        assert!(build("type", json!([])).is_err());
        assert!(build("type", CheckArg::Types(vec![])).is_err());
        assert!(build("type", json!("hash")).is_err());
        assert!(build("type", json!(["string", 7])).is_err());
        assert!(build("type", true).is_err());
    }

    #[test]
    fn exclude_and_also_take_string_or_string_array() {
        assert_matches!(build("exclude", "url"), Ok(AttributeCheck::Exclude(n)) if n == vec!["url"]);
        assert_matches!(
            build("also", json!(["a", "b"])),
            Ok(AttributeCheck::Also(n)) if n == vec!["a", "b"]
        );
        let err = build("exclude", json!(["a", 1])).unwrap_err();
        assert!(err.to_string().contains("attribute exclusions"));
        let err = build("also", json!(3)).unwrap_err();
        assert!(err.to_string().contains("additional attribute requirements"));
    }

    #[test]
    fn references_requires_a_store() {
        let err = build("references", "repo").unwrap_err();
        assert!(err.to_string().contains("reference store"));
    }

    #[test]
    fn one_of_validates_shape() {
        assert_matches!(
            build("one_of", json!(["a", 1, true, null])),
            Ok(AttributeCheck::OneOf(v)) if v.len() == 4
        );
        let err = build("one_of", json!("a")).unwrap_err();
        assert!(err.to_string().contains("not a string"));
        let err = build("one_of", json!([{"a": 1}])).unwrap_err();
        assert!(err.to_string().contains("not object"));
        let err = build("one_of", json!(["a", "b", "a"])).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert!(build("one_of", json!([])).is_err());
    }

    #[test]
    fn one_of_duplicates_are_type_sensitive() {
        // 1 and "1" are distinct literals.
        assert!(build("one_of", json!([1, "1"])).is_ok());
    }

    #[test]
    fn integer_is_assignable_to_number_only_one_way() {
        assert!(BaseType::Number.matches(&json!(3)));
        assert!(BaseType::Number.matches(&json!(3.5)));
        assert!(BaseType::Integer.matches(&json!(3)));
        assert!(!BaseType::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn null_matches_only_null() {
        for base in [
            BaseType::String,
            BaseType::Number,
            BaseType::Integer,
            BaseType::Boolean,
            BaseType::Array,
            BaseType::Object,
        ] {
            assert!(!base.matches(&Value::Null), "{} matched null", base.name());
        }
        assert!(BaseType::Null.matches(&Value::Null));
    }

    #[test]
    fn url_candidate_refines_strings() {
        let url = TypeCandidate::url();
        assert_eq!(url.base(), BaseType::String);
        assert!(url.refine(&json!("http://example.com/repo.iso")).is_ok());
        assert!(url.refine(&json!("not a url")).is_err());
    }

    #[test]
    fn url_candidate_accepts_relative_references() {
        let url = TypeCandidate::url();
        for reference in ["centos/7/os", "/srv/repo", "repo.iso", "../images/x.iso?arch=x86_64"] {
            assert!(url.refine(&json!(reference)).is_ok(), "{reference}");
        }
    }

    #[test]
    fn url_candidate_rejects_malformed_references() {
        let url = TypeCandidate::url();
        assert_eq!(
            url.refine(&json!("centos 7/os")),
            Err("invalid character ' '".to_string())
        );
        assert!(url.refine(&json!("http://[::1/repo")).is_err());
        assert!(url.refine(&json!("http://example.com:99999/repo")).is_err());
    }

    #[test]
    fn literals_render_without_quotes() {
        assert_eq!(render_literal(&json!("a")), "a");
        assert_eq!(render_literal(&json!(null)), "null");
        assert_eq!(render_literal(&json!(2)), "2");
        assert_eq!(render_literal(&json!(true)), "true");
    }
}
