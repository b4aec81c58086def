//! Domain core for command ingestion.
//!
//! Two cooperating pieces live here, both free of database and HTTP
//! dependencies:
//!
//! - [`validation`]: declarative per-attribute schemas that check a command
//!   payload before anything is written.
//! - [`import`]: the idempotent create-or-match-or-conflict resolver that
//!   applies a validated payload through an [`import::IdentityStore`].

pub mod error;
pub mod import;
pub mod memory;
pub mod types;
pub mod validation;
