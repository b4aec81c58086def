//! Repository layer.

pub mod entity_repo;
pub mod event_repo;

pub use entity_repo::EntityRepo;
pub use event_repo::EventRepo;
