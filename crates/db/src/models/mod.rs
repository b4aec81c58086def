//! Row types for the `entities` and `events` tables.

pub mod entity;
pub mod event;
