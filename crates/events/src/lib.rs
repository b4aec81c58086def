//! Provisioning event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope.
//! - [`PublishOnImport`]: import hook announcing every created or matched
//!   entity on the bus.
//! - [`EventPersistence`]: background service writing every event to the
//!   `events` table.

pub mod bus;
pub mod hook;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use hook::PublishOnImport;
pub use persistence::EventPersistence;
