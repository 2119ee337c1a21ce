use glam::Vec3;
use gridhost_common::EntityId;
use std::collections::BTreeSet;

/// A 2D cell coordinate in the instance grid (Y axis ignored for
/// partitioning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell containing a world position for the given cell size.
    pub fn from_position(pos: Vec3, cell_size: f32) -> Self {
        Self {
            x: (pos.x / cell_size).floor() as i32,
            z: (pos.z / cell_size).floor() as i32,
        }
    }

    /// World-space bounds of this cell as (min_x, min_z, max_x, max_z).
    pub fn bounds(&self, cell_size: f32) -> (f32, f32, f32, f32) {
        let min_x = self.x as f32 * cell_size;
        let min_z = self.z as f32 * cell_size;
        (min_x, min_z, min_x + cell_size, min_z + cell_size)
    }

    /// Whether this cell's rectangle intersects the circle of `radius`
    /// around `point` (XZ plane).
    pub fn intersects_circle(&self, point: Vec3, radius: f32, cell_size: f32) -> bool {
        let (min_x, min_z, max_x, max_z) = self.bounds(cell_size);
        let nearest_x = point.x.clamp(min_x, max_x);
        let nearest_z = point.z.clamp(min_z, max_z);
        let dx = point.x - nearest_x;
        let dz = point.z - nearest_z;
        dx * dx + dz * dz <= radius * radius
    }
}

/// One grid cell: resident entities plus the players observing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub entities: BTreeSet<EntityId>,
    pub observers: BTreeSet<EntityId>,
}

impl Cell {
    /// A cell with no residents and no observers carries no information and
    /// should not be stored.
    pub fn is_vacant(&self) -> bool {
        self.entities.is_empty() && self.observers.is_empty()
    }
}
