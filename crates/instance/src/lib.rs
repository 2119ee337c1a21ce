//! Map instance: the authoritative owner of one world map's entity table and
//! spatial grid.
//!
//! All mutation is serialized through one logical writer: producers on any
//! thread enqueue commands through a [`MapHandle`]; the instance's tick
//! thread drains and applies them in arrival order, then advances public
//! events and lifecycle bookkeeping.
//!
//! # Invariants
//! - Entity table and cell membership are always mutually consistent; a
//!   detected desync marks the instance unhealthy instead of being patched.
//! - An entity's recorded cell always equals the cell derived from its
//!   committed position.
//! - Only the tick thread touches the entity table and grid. Cross-thread
//!   reads go through [`MapHandle::invoke`] or the published status atomics.

mod command;
mod courier;
mod entity;
mod map;
mod search;
mod status;
mod terrain;

pub use command::{Command, MapError};
pub use courier::{Courier, NullCourier};
pub use entity::Entity;
pub use map::MapInstance;
pub use search::{Any, KindIs, SearchCheck, WithinRange};
pub use status::{Lifecycle, MapHandle, MapStatus};
pub use terrain::{FlatTerrain, NullTerrain, Terrain};

pub fn crate_info() -> &'static str {
    "gridhost-instance v0.1.0"
}
