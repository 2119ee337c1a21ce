use glam::Vec3;
use gridhost_common::EntityKind;

use crate::entity::Entity;

/// Predicate applied by [`MapInstance::search`](crate::MapInstance::search)
/// to the entities of the intersected cells.
pub trait SearchCheck {
    fn matches(&self, entity: &Entity) -> bool;
}

/// Matches every entity.
#[derive(Debug, Default, Clone, Copy)]
pub struct Any;

impl SearchCheck for Any {
    fn matches(&self, _entity: &Entity) -> bool {
        true
    }
}

/// Matches entities of one kind.
#[derive(Debug, Clone, Copy)]
pub struct KindIs(pub EntityKind);

impl SearchCheck for KindIs {
    fn matches(&self, entity: &Entity) -> bool {
        entity.kind == self.0
    }
}

/// Precise distance filter: within `radius` of `point` in 3D, inclusive of
/// the entity's bounding radius. Compose with the cell-granular search when
/// exact ranges matter.
#[derive(Debug, Clone, Copy)]
pub struct WithinRange {
    pub point: Vec3,
    pub radius: f32,
}

impl SearchCheck for WithinRange {
    fn matches(&self, entity: &Entity) -> bool {
        let reach = self.radius + entity.bounding_radius;
        entity.position.distance_squared(self.point) <= reach * reach
    }
}

impl<F> SearchCheck for F
where
    F: Fn(&Entity) -> bool,
{
    fn matches(&self, entity: &Entity) -> bool {
        self(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridhost_common::EntityId;

    fn npc_at(x: f32) -> Entity {
        Entity::new(EntityId::new(), EntityKind::Npc, Vec3::new(x, 0.0, 0.0), 1.0)
    }

    #[test]
    fn any_matches_everything() {
        assert!(Any.matches(&npc_at(0.0)));
    }

    #[test]
    fn kind_filter() {
        let npc = npc_at(0.0);
        assert!(KindIs(EntityKind::Npc).matches(&npc));
        assert!(!KindIs(EntityKind::Player).matches(&npc));
    }

    #[test]
    fn within_range_includes_bounding_radius() {
        let check = WithinRange {
            point: Vec3::ZERO,
            radius: 10.0,
        };
        // Center at 10.5 but bounding radius 1.0 brings it in reach.
        assert!(check.matches(&npc_at(10.5)));
        assert!(!check.matches(&npc_at(12.0)));
    }

    #[test]
    fn closures_are_checks() {
        let check = |entity: &Entity| entity.position.x > 5.0;
        assert!(check.matches(&npc_at(6.0)));
        assert!(!check.matches(&npc_at(4.0)));
    }
}
