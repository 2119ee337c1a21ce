//! Spatial partitioning for one map instance.
//!
//! A bounded 2D plane is split into fixed-size square cells (the Y axis is
//! ignored for partitioning). Each cell tracks the entities resident in it
//! and the players currently observing it.
//!
//! # Invariants
//! - An entity's recorded cell always equals the cell derived from its
//!   committed position; `remove`/`relocate` verify this and report a
//!   membership violation instead of silently patching.
//! - Storage is sparse: a cell with no residents and no observers is not
//!   stored.
//! - All iteration is over BTree collections, so results are deterministic
//!   even where callers may not rely on order.

mod cell;
mod grid;

pub use cell::{Cell, CellCoord};
pub use grid::{Grid, GridError};

pub fn crate_info() -> &'static str {
    "gridhost-grid v0.1.0"
}
