//! Provisioning command API.
//!
//! Exposes config, state, error handling, the command catalog and routes so
//! integration tests and the binary entrypoint can both build the router.

pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod stores;
