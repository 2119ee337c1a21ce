use glam::Vec3;
use gridhost_common::{EntityId, EntityKind};
use gridhost_grid::CellCoord;

/// One entity resident on a map instance.
///
/// Owned exclusively by the instance holding it; code outside the tick
/// thread refers to entities by [`EntityId`] only. The handle is created
/// when the Add command is applied (not when it is enqueued) and destroyed
/// when a Remove command is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub bounding_radius: f32,
    /// Per-player vision override. `None` falls back to the instance
    /// default, then the system default. Ignored for non-players.
    pub vision_range: Option<f32>,
    pub(crate) cell: CellCoord,
}

impl Entity {
    /// Describe an entity to be added. The grid cell is assigned when the
    /// Add command is applied against the instance's cell size.
    pub fn new(id: EntityId, kind: EntityKind, position: Vec3, bounding_radius: f32) -> Self {
        Self {
            id,
            kind,
            position,
            bounding_radius,
            vision_range: None,
            cell: CellCoord::new(0, 0),
        }
    }

    pub fn with_vision_range(mut self, range: f32) -> Self {
        self.vision_range = Some(range);
        self
    }

    /// Cell currently containing this entity.
    pub fn cell(&self) -> CellCoord {
        self.cell
    }

    pub fn is_player(&self) -> bool {
        self.kind.is_player()
    }
}
