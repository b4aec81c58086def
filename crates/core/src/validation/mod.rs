//! Declarative command validation.
//!
//! A [`Schema`] is an ordered list of [`AttributeSpec`]s, each owning a set
//! of [`AttributeCheck`]s. Schemas are built once and shared read-only;
//! validating a payload never mutates anything.

pub mod attribute;
pub mod check;
pub mod reference;
pub mod schema;

pub use attribute::AttributeSpec;
pub use check::{AttributeCheck, BaseType, CheckArg, Refinement, TypeCandidate};
pub use reference::{KeyedBy, ReferenceRegistry, ReferenceStore};
pub use schema::{validate, Schema, SchemaBuilder};
