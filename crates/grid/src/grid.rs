use glam::Vec3;
use gridhost_common::EntityId;
use std::collections::{BTreeMap, BTreeSet};

use crate::cell::{Cell, CellCoord};

/// Errors from grid membership bookkeeping.
///
/// A membership violation means the caller's entity table and the grid have
/// desynced; per the runtime's error policy this is fatal to the owning
/// instance, never silently repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("entity {entity} not resident in cell ({}, {})", cell.x, cell.z)]
    MembershipViolation { entity: EntityId, cell: CellCoord },
}

/// Sparse fixed-size grid over the XZ plane.
///
/// Tracks which entities occupy which cell and which players observe each
/// cell. Pure data structure: all mutation happens through the owning map
/// instance on its tick thread.
#[derive(Debug, Clone)]
pub struct Grid {
    cell_size: f32,
    cells: BTreeMap<CellCoord, Cell>,
}

impl Grid {
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive");
        Self {
            cell_size,
            cells: BTreeMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of non-vacant cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell containing a world position.
    pub fn cell_at(&self, pos: Vec3) -> CellCoord {
        CellCoord::from_position(pos, self.cell_size)
    }

    /// Insert an entity at a position. Returns the cell it landed in.
    pub fn place(&mut self, entity: EntityId, pos: Vec3) -> CellCoord {
        let coord = self.cell_at(pos);
        self.cells.entry(coord).or_default().entities.insert(entity);
        coord
    }

    /// Move an entity from its current cell to the cell containing
    /// `new_pos`. No-op when the cell is unchanged.
    pub fn relocate(
        &mut self,
        entity: EntityId,
        from: CellCoord,
        new_pos: Vec3,
    ) -> Result<CellCoord, GridError> {
        let to = self.cell_at(new_pos);
        if to == from {
            // Verify residency even on the no-op path; a miss is the same
            // desync a real move would have hit.
            let resident = self
                .cells
                .get(&from)
                .is_some_and(|cell| cell.entities.contains(&entity));
            if !resident {
                tracing::error!(%entity, ?from, "relocate source cell does not hold entity");
                return Err(GridError::MembershipViolation { entity, cell: from });
            }
            return Ok(to);
        }
        self.remove(entity, from)?;
        self.cells.entry(to).or_default().entities.insert(entity);
        Ok(to)
    }

    /// Remove an entity from the cell it is recorded in.
    pub fn remove(&mut self, entity: EntityId, cell: CellCoord) -> Result<(), GridError> {
        let Some(state) = self.cells.get_mut(&cell) else {
            tracing::error!(%entity, ?cell, "remove from a cell with no residents");
            return Err(GridError::MembershipViolation { entity, cell });
        };
        if !state.entities.remove(&entity) {
            tracing::error!(%entity, ?cell, "remove of an entity the cell does not hold");
            return Err(GridError::MembershipViolation { entity, cell });
        }
        if state.is_vacant() {
            self.cells.remove(&cell);
        }
        Ok(())
    }

    /// Cells intersecting the circle of `radius` around `point`; with no
    /// radius, every non-vacant cell.
    pub fn cells_in_range(&self, point: Vec3, radius: Option<f32>) -> Vec<CellCoord> {
        match radius {
            None => self.cells.keys().copied().collect(),
            Some(radius) => {
                let radius = radius.max(0.0);
                let min = self.cell_at(Vec3::new(point.x - radius, 0.0, point.z - radius));
                let max = self.cell_at(Vec3::new(point.x + radius, 0.0, point.z + radius));
                let mut out = Vec::new();
                for x in min.x..=max.x {
                    for z in min.z..=max.z {
                        let coord = CellCoord::new(x, z);
                        if coord.intersects_circle(point, radius, self.cell_size) {
                            out.push(coord);
                        }
                    }
                }
                out
            }
        }
    }

    /// Union of resident entities across the cells intersecting the query
    /// circle. Result order is unspecified; callers must not depend on it.
    pub fn members_in_range(&self, point: Vec3, radius: Option<f32>) -> Vec<EntityId> {
        let mut members = Vec::new();
        for coord in self.cells_in_range(point, radius) {
            if let Some(cell) = self.cells.get(&coord) {
                members.extend(cell.entities.iter().copied());
            }
        }
        members
    }

    /// Resident entities of one cell.
    pub fn cell_members(&self, coord: CellCoord) -> BTreeSet<EntityId> {
        self.cells
            .get(&coord)
            .map(|cell| cell.entities.clone())
            .unwrap_or_default()
    }

    /// Register a player as observing a cell.
    pub fn add_observer(&mut self, coord: CellCoord, player: EntityId) {
        self.cells.entry(coord).or_default().observers.insert(player);
    }

    /// Remove a player from a cell's observer set. Removing an observer that
    /// was never added is a no-op.
    pub fn remove_observer(&mut self, coord: CellCoord, player: EntityId) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.observers.remove(&player);
            if cell.is_vacant() {
                self.cells.remove(&coord);
            }
        }
    }

    /// Observer set of one cell.
    pub fn observers(&self, coord: CellCoord) -> BTreeSet<EntityId> {
        self.cells
            .get(&coord)
            .map(|cell| cell.observers.clone())
            .unwrap_or_default()
    }

    /// Deduplicated union of every cell's observer set. Computed per call;
    /// membership changes every tick, so nothing is cached.
    pub fn all_observers(&self) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        for cell in self.cells.values() {
            out.extend(cell.observers.iter().copied());
        }
        out
    }
}
