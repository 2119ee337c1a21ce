//! Shared types for the gridhost runtime: entity guids, entity kinds,
//! instance keys, and content-injected configuration.
//!
//! # Invariants
//! - All content parameters (cell size, vision ranges) are injected; this
//!   crate never invents numeric defaults for them.
//! - Id types are `Ord` so dependent crates can use BTree collections for
//!   deterministic iteration.

mod config;
mod types;

pub use config::{ConfigError, MapConfig};
pub use types::{EntityId, EntityKind, InstanceKey, ResurrectionPolicy};

pub fn crate_info() -> &'static str {
    "gridhost-common v0.1.0"
}
