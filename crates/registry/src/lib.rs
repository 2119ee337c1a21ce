//! Instance registry: maps (definition id, discriminator) keys to live map
//! instances, creating lazily and tearing down when empty.
//!
//! # Invariants
//! - At most one live instance exists per key; concurrent creators are
//!   serialized by a per-key lock with a re-check (double-checked locking).
//! - Each instance runs on its own dedicated tick thread; the registry never
//!   touches instance state, only handles and published status.
//! - Teardown happens on sweep: Destroyed or unhealthy instances are removed
//!   and their threads joined; the next lookup for that key creates a fresh
//!   instance.

mod registry;

pub use registry::{InstanceFactory, Registry, RegistryConfig, RegistryError};

pub fn crate_info() -> &'static str {
    "gridhost-registry v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("registry"));
    }
}
