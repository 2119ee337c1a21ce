use glam::Vec3;
use gridhost_common::{ConfigError, EntityId, InstanceKey, MapConfig, ResurrectionPolicy};
use gridhost_event::EventCoordinator;
use gridhost_grid::{CellCoord, Grid};
use gridhost_queue::CommandQueue;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::command::{Command, MapError};
use crate::courier::Courier;
use crate::entity::Entity;
use crate::search::SearchCheck;
use crate::status::{Lifecycle, MapHandle, MapStatus};
use crate::terrain::Terrain;

/// Internal lifecycle with the draining timestamp.
#[derive(Debug, Clone, Copy)]
enum LifecycleState {
    Active,
    Draining { since: Instant },
    Destroyed,
}

impl LifecycleState {
    fn coarse(self) -> Lifecycle {
        match self {
            LifecycleState::Active => Lifecycle::Active,
            LifecycleState::Draining { .. } => Lifecycle::Draining,
            LifecycleState::Destroyed => Lifecycle::Destroyed,
        }
    }
}

/// One live map instance: the sole writer of its entity table and grid.
///
/// The value is owned by its tick thread (or, in tests, by whichever single
/// context drives [`tick`](Self::tick)). Everything reachable from other
/// threads lives behind the [`MapHandle`].
pub struct MapInstance {
    key: InstanceKey,
    uid: Uuid,
    config: MapConfig,
    grace: Duration,
    resurrection: ResurrectionPolicy,
    terrain: Arc<dyn Terrain>,
    courier: Arc<dyn Courier>,
    grid: Grid,
    entities: BTreeMap<EntityId, Entity>,
    queue: CommandQueue<Command>,
    events: EventCoordinator,
    lifecycle: LifecycleState,
    status: Arc<MapStatus>,
}

impl MapInstance {
    /// Construct an Active instance. `grace` is the empty-table interval
    /// after which the instance destroys itself.
    pub fn new(
        key: InstanceKey,
        config: MapConfig,
        grace: Duration,
        resurrection: ResurrectionPolicy,
        terrain: Arc<dyn Terrain>,
        courier: Arc<dyn Courier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let uid = Uuid::new_v4();
        tracing::info!(%key, %uid, "map instance created");
        Ok(Self {
            grid: Grid::new(config.cell_size),
            key,
            uid,
            config,
            grace,
            resurrection,
            terrain,
            courier,
            entities: BTreeMap::new(),
            queue: CommandQueue::new(),
            events: EventCoordinator::new(),
            lifecycle: LifecycleState::Active,
            status: Arc::new(MapStatus::new()),
        })
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn instance_uid(&self) -> Uuid {
        self.uid
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.coarse()
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Producer-side handle for any thread.
    pub fn handle(&self) -> MapHandle {
        MapHandle::new(
            self.key.clone(),
            self.uid,
            self.queue.sender(),
            Arc::clone(&self.status),
        )
    }

    /// Run one tick: drain the queue, apply every command in arrival order,
    /// advance public events, update lifecycle, publish status.
    pub fn tick(&mut self, now: Instant) {
        let _span = tracing::debug_span!("tick", key = %self.key).entered();
        for command in self.queue.drain() {
            self.apply(command);
        }
        self.events.update();
        self.update_lifecycle(now);
        self.status
            .publish(self.lifecycle.coarse(), self.entities.len());
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Add(entity) => self.apply_add(entity),
            Command::Remove(id) => self.apply_remove(id),
            Command::Relocate {
                id,
                target,
                completion,
            } => {
                let result = self.apply_relocate(id, target);
                completion.complete(result);
            }
            Command::Broadcast(payload) => self.broadcast(&payload),
            Command::Invoke(work) => work(self),
        }
    }

    fn apply_add(&mut self, mut entity: Entity) {
        if self.entities.contains_key(&entity.id) {
            // Caller bug: the guid is already resident. Drop the command.
            tracing::warn!(entity = %entity.id, "duplicate add dropped");
            return;
        }
        entity.cell = self.grid.place(entity.id, entity.position);
        if entity.is_player() {
            let range = self.config.effective_vision_range(entity.vision_range);
            for cell in self.vision_cells(entity.cell, range) {
                self.grid.add_observer(cell, entity.id);
            }
        }
        tracing::debug!(entity = %entity.id, cell = ?entity.cell, "entity added");
        self.entities.insert(entity.id, entity);
    }

    fn apply_remove(&mut self, id: EntityId) {
        let Some(entity) = self.entities.remove(&id) else {
            // Idempotent: removing an absent entity is a no-op.
            tracing::debug!(entity = %id, "remove of absent entity ignored");
            return;
        };
        if let Err(err) = self.grid.remove(id, entity.cell) {
            self.fail_invariant(&err.to_string());
            return;
        }
        if entity.is_player() {
            let range = self.config.effective_vision_range(entity.vision_range);
            for cell in self.vision_cells(entity.cell, range) {
                self.grid.remove_observer(cell, id);
            }
        }
        tracing::debug!(entity = %id, "entity removed");
    }

    fn apply_relocate(&mut self, id: EntityId, target: Vec3) -> Result<Vec3, MapError> {
        let Some(entity) = self.entities.get(&id) else {
            return Err(MapError::EntityNotFound(id));
        };
        let old_cell = entity.cell;
        let is_player = entity.is_player();
        let range = self.config.effective_vision_range(entity.vision_range);

        let committed = self.resolve_position(target);
        let new_cell = match self.grid.relocate(id, old_cell, committed) {
            Ok(cell) => cell,
            Err(err) => {
                self.fail_invariant(&err.to_string());
                return Err(MapError::InvariantViolation);
            }
        };

        if is_player && new_cell != old_cell {
            let before: BTreeSet<CellCoord> =
                self.vision_cells(old_cell, range).into_iter().collect();
            let after: BTreeSet<CellCoord> =
                self.vision_cells(new_cell, range).into_iter().collect();
            for cell in before.difference(&after) {
                self.grid.remove_observer(*cell, id);
            }
            for cell in after.difference(&before) {
                self.grid.add_observer(*cell, id);
            }
        }

        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(MapError::EntityNotFound(id))?;
        entity.position = committed;
        entity.cell = new_cell;
        Ok(committed)
    }

    /// Resolve a requested position into the committed one: height snaps to
    /// the terrain where it is loaded, otherwise the request stands.
    fn resolve_position(&self, target: Vec3) -> Vec3 {
        match self.terrain.height(target.x, target.z) {
            Some(height) => Vec3::new(target.x, height, target.z),
            None => target,
        }
    }

    /// Cells a player standing in `center` observes with the given vision
    /// range: the square of cells within `ceil(range / cell_size)`.
    fn vision_cells(&self, center: CellCoord, range: f32) -> Vec<CellCoord> {
        let reach = (range / self.config.cell_size).ceil() as i32;
        let mut cells = Vec::with_capacity(((2 * reach + 1) * (2 * reach + 1)) as usize);
        for dx in -reach..=reach {
            for dz in -reach..=reach {
                cells.push(CellCoord::new(center.x + dx, center.z + dz));
            }
        }
        cells
    }

    fn fail_invariant(&mut self, detail: &str) {
        tracing::error!(key = %self.key, detail, "grid/table desync, marking instance unhealthy");
        self.status.mark_unhealthy();
    }

    fn update_lifecycle(&mut self, now: Instant) {
        match self.lifecycle {
            LifecycleState::Active if self.entities.is_empty() => {
                tracing::info!(key = %self.key, "instance empty, draining");
                self.lifecycle = LifecycleState::Draining { since: now };
            }
            LifecycleState::Draining { .. } if !self.entities.is_empty() => {
                tracing::info!(key = %self.key, "entity entered, draining cancelled");
                self.lifecycle = LifecycleState::Active;
            }
            LifecycleState::Draining { since } if now.duration_since(since) >= self.grace => {
                tracing::info!(key = %self.key, "grace elapsed, instance destroyed");
                self.lifecycle = LifecycleState::Destroyed;
            }
            _ => {}
        }
    }

    /// Entities of the cells intersecting the query circle that satisfy the
    /// check. Result order is unspecified. Tick-thread confined; other
    /// threads route through [`MapHandle::invoke`].
    pub fn search(
        &self,
        point: Vec3,
        radius: Option<f32>,
        check: &dyn SearchCheck,
    ) -> Vec<&Entity> {
        self.grid
            .members_in_range(point, radius)
            .into_iter()
            .filter_map(|id| {
                let entity = self.entities.get(&id);
                if entity.is_none() {
                    // Grid says resident, table disagrees.
                    tracing::error!(entity = %id, "search hit entity missing from table");
                    self.status.mark_unhealthy();
                }
                entity
            })
            .filter(|entity| check.matches(entity))
            .collect()
    }

    /// Cells intersecting the query circle; no radius means every non-empty
    /// cell.
    pub fn grid_search(&self, point: Vec3, radius: Option<f32>) -> Vec<CellCoord> {
        self.grid.cells_in_range(point, radius)
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Deliver an opaque payload to every player currently observing any
    /// cell, exactly once per player. The observer union is computed per
    /// call, never cached across ticks.
    pub fn broadcast(&self, payload: &[u8]) {
        let observers = self.grid.all_observers();
        tracing::trace!(
            recipients = observers.len(),
            bytes = payload.len(),
            "broadcast"
        );
        for player in observers {
            self.courier.deliver(player, payload);
        }
    }

    /// Terrain height at (x, z); `None` outside loaded bounds.
    pub fn terrain_height(&self, x: f32, z: f32) -> Option<f32> {
        self.terrain.height(x, z)
    }

    /// Static respawn classification for this map.
    pub fn resurrection_policy(&self) -> ResurrectionPolicy {
        self.resurrection
    }

    /// Notify the cell at (x, z) that a player now observes it.
    pub fn grid_add_visible_player(&mut self, x: i32, z: i32, player: EntityId) {
        self.grid.add_observer(CellCoord::new(x, z), player);
    }

    /// Notify the cell at (x, z) that a player no longer observes it.
    pub fn grid_remove_visible_player(&mut self, x: i32, z: i32, player: EntityId) {
        self.grid.remove_observer(CellCoord::new(x, z), player);
    }

    /// Observers of one cell. Exposed for content layers driving visibility
    /// dependent logic.
    pub fn cell_observers(&self, cell: CellCoord) -> BTreeSet<EntityId> {
        self.grid.observers(cell)
    }

    pub fn public_events(&self) -> &EventCoordinator {
        &self.events
    }

    /// Event registration, scoring and finish-listener hookup. Tick-thread
    /// confined like all other mutation.
    pub fn public_events_mut(&mut self) -> &mut EventCoordinator {
        &mut self.events
    }
}

impl std::fmt::Debug for MapInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapInstance")
            .field("key", &self.key)
            .field("uid", &self.uid)
            .field("entities", &self.entities.len())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::courier::NullCourier;
    use crate::search::{Any, KindIs, WithinRange};
    use crate::terrain::{FlatTerrain, NullTerrain};
    use gridhost_common::EntityKind;
    use gridhost_event::{PublicEvent, PublicEventId, ScoreThreshold, TeamId};
    use parking_lot::Mutex;

    const GRACE: Duration = Duration::from_secs(60);

    fn config() -> MapConfig {
        MapConfig {
            cell_size: 100.0,
            vision_range: None,
            fallback_vision_range: 150.0,
        }
    }

    fn instance() -> MapInstance {
        MapInstance::new(
            InstanceKey::new("TestMap"),
            config(),
            GRACE,
            ResurrectionPolicy::NearestSpawn,
            Arc::new(NullTerrain),
            Arc::new(NullCourier),
        )
        .unwrap()
    }

    fn instance_with_terrain(terrain: impl Terrain + 'static) -> MapInstance {
        MapInstance::new(
            InstanceKey::new("TestMap"),
            config(),
            GRACE,
            ResurrectionPolicy::NearestSpawn,
            Arc::new(terrain),
            Arc::new(NullCourier),
        )
        .unwrap()
    }

    fn npc(position: Vec3) -> Entity {
        Entity::new(EntityId::new(), EntityKind::Npc, position, 0.5)
    }

    fn player(position: Vec3) -> Entity {
        Entity::new(EntityId::new(), EntityKind::Player, position, 0.5)
    }

    #[test]
    fn add_then_relocate_moves_cells() {
        let mut map = instance();
        let handle = map.handle();
        let entity = npc(Vec3::new(50.0, 0.0, 50.0));
        let id = entity.id;

        handle.enqueue_add(entity);
        map.tick(Instant::now());
        assert_eq!(map.get_entity(id).unwrap().cell(), CellCoord::new(0, 0));

        let pending = handle.enqueue_relocate(id, Vec3::new(250.0, 0.0, 50.0));
        map.tick(Instant::now());
        assert_eq!(pending.wait().unwrap(), Ok(Vec3::new(250.0, 0.0, 50.0)));
        assert_eq!(map.get_entity(id).unwrap().cell(), CellCoord::new(2, 0));

        let near_new: Vec<EntityId> = map
            .search(Vec3::new(250.0, 0.0, 50.0), Some(10.0), &Any)
            .iter()
            .map(|e| e.id)
            .collect();
        assert!(near_new.contains(&id));

        let near_old = map.search(Vec3::new(50.0, 0.0, 50.0), Some(10.0), &Any);
        assert!(near_old.iter().all(|e| e.id != id));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut map = instance();
        let handle = map.handle();
        let entity = npc(Vec3::ZERO);
        let id = entity.id;
        handle.enqueue_add(entity);
        map.tick(Instant::now());
        assert_eq!(map.entity_count(), 1);

        handle.enqueue_remove(id);
        handle.enqueue_remove(id);
        map.tick(Instant::now());
        assert_eq!(map.entity_count(), 0);
        assert!(map.is_healthy());
    }

    #[test]
    fn relocate_of_missing_entity_fails_the_completion() {
        let mut map = instance();
        let handle = map.handle();
        let ghost = EntityId::new();
        let pending = handle.enqueue_relocate(ghost, Vec3::ZERO);
        map.tick(Instant::now());
        assert_eq!(pending.wait().unwrap(), Err(MapError::EntityNotFound(ghost)));
    }

    #[test]
    fn duplicate_add_is_dropped() {
        let mut map = instance();
        let handle = map.handle();
        let original = npc(Vec3::new(10.0, 0.0, 10.0));
        let id = original.id;
        handle.enqueue_add(original.clone());
        map.tick(Instant::now());

        let mut imposter = npc(Vec3::new(900.0, 0.0, 900.0));
        imposter.id = id;
        handle.enqueue_add(imposter);
        map.tick(Instant::now());

        assert_eq!(map.entity_count(), 1);
        assert_eq!(
            map.get_entity(id).unwrap().position,
            Vec3::new(10.0, 0.0, 10.0)
        );
    }

    #[test]
    fn relocate_to_current_position_is_stable() {
        let mut map = instance();
        let handle = map.handle();
        let entity = player(Vec3::new(50.0, 0.0, 50.0));
        let id = entity.id;
        handle.enqueue_add(entity);
        map.tick(Instant::now());

        let cell_before = map.get_entity(id).unwrap().cell();
        let observers_before: Vec<(CellCoord, BTreeSet<EntityId>)> = map
            .grid_search(Vec3::new(50.0, 0.0, 50.0), Some(300.0))
            .into_iter()
            .map(|c| (c, map.cell_observers(c)))
            .collect();

        let pending = handle.enqueue_relocate(id, Vec3::new(50.0, 0.0, 50.0));
        map.tick(Instant::now());
        pending.wait().unwrap().unwrap();

        assert_eq!(map.get_entity(id).unwrap().cell(), cell_before);
        for (cell, before) in observers_before {
            assert_eq!(map.cell_observers(cell), before, "cell {cell:?} changed");
        }
    }

    #[test]
    fn same_commands_yield_identical_state() {
        let positions: Vec<Vec3> = (0..20)
            .map(|i| Vec3::new(i as f32 * 37.0, 0.0, i as f32 * -11.0))
            .collect();
        let ids: Vec<EntityId> = (0..20).map(|_| EntityId::new()).collect();

        let run = || {
            let mut map = instance();
            let handle = map.handle();
            for (id, pos) in ids.iter().zip(&positions) {
                handle.enqueue_add(Entity::new(*id, EntityKind::Npc, *pos, 0.5));
            }
            for id in ids.iter().step_by(3) {
                handle.enqueue_relocate(*id, Vec3::new(500.0, 0.0, 500.0));
            }
            for id in ids.iter().step_by(5) {
                handle.enqueue_remove(*id);
            }
            map.tick(Instant::now());
            map
        };

        let a = run();
        let b = run();
        let snapshot = |map: &MapInstance| -> Vec<(EntityId, Vec3, CellCoord)> {
            ids.iter()
                .filter_map(|id| map.get_entity(*id))
                .map(|e| (e.id, e.position, e.cell()))
                .collect()
        };
        assert_eq!(snapshot(&a), snapshot(&b));
        assert_eq!(a.entity_count(), b.entity_count());
    }

    #[test]
    fn search_is_monotonic_in_radius() {
        let mut map = instance();
        let handle = map.handle();
        for i in 0..10 {
            handle.enqueue_add(npc(Vec3::new(i as f32 * 60.0, 0.0, 0.0)));
        }
        map.tick(Instant::now());

        let point = Vec3::new(120.0, 0.0, 0.0);
        let mut previous: BTreeSet<EntityId> = BTreeSet::new();
        for radius in [5.0, 80.0, 200.0, 600.0] {
            let current: BTreeSet<EntityId> = map
                .search(point, Some(radius), &Any)
                .iter()
                .map(|e| e.id)
                .collect();
            assert!(previous.is_subset(&current));
            previous = current;
        }
    }

    #[test]
    fn search_filters_by_kind() {
        let mut map = instance();
        let handle = map.handle();
        let p = player(Vec3::ZERO);
        let player_id = p.id;
        handle.enqueue_add(p);
        handle.enqueue_add(npc(Vec3::new(1.0, 0.0, 1.0)));
        map.tick(Instant::now());

        let players = map.search(Vec3::ZERO, Some(50.0), &KindIs(EntityKind::Player));
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].id, player_id);
    }

    #[test]
    fn within_range_check_is_precise() {
        let mut map = instance();
        let handle = map.handle();
        let near = npc(Vec3::new(5.0, 0.0, 0.0));
        let far = npc(Vec3::new(90.0, 0.0, 0.0)); // same cell, out of range
        let near_id = near.id;
        handle.enqueue_add(near);
        handle.enqueue_add(far);
        map.tick(Instant::now());

        let check = WithinRange {
            point: Vec3::ZERO,
            radius: 10.0,
        };
        let hits = map.search(Vec3::ZERO, Some(10.0), &check);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, near_id);
    }

    #[test]
    fn relocate_snaps_height_to_terrain() {
        let mut map = instance_with_terrain(FlatTerrain {
            height: 20.0,
            half_extent: 1000.0,
        });
        let handle = map.handle();
        let entity = npc(Vec3::new(0.0, 20.0, 0.0));
        let id = entity.id;
        handle.enqueue_add(entity);
        map.tick(Instant::now());

        let pending = handle.enqueue_relocate(id, Vec3::new(50.0, 77.0, 50.0));
        map.tick(Instant::now());
        let committed = pending.wait().unwrap().unwrap();
        assert_eq!(committed, Vec3::new(50.0, 20.0, 50.0));
        assert_eq!(map.get_entity(id).unwrap().position, committed);
    }

    #[test]
    fn terrain_height_outside_bounds_is_none() {
        let map = instance_with_terrain(FlatTerrain {
            height: 5.0,
            half_extent: 100.0,
        });
        assert_eq!(map.terrain_height(0.0, 0.0), Some(5.0));
        assert_eq!(map.terrain_height(5000.0, 0.0), None);
    }

    #[test]
    fn broadcast_reaches_each_observer_once() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<EntityId>>);
        impl Courier for Recorder {
            fn deliver(&self, player: EntityId, _payload: &[u8]) {
                self.0.lock().push(player);
            }
        }

        let recorder = Arc::new(Recorder::default());
        let mut map = MapInstance::new(
            InstanceKey::new("TestMap"),
            config(),
            GRACE,
            ResurrectionPolicy::NearestSpawn,
            Arc::new(NullTerrain),
            Arc::clone(&recorder) as Arc<dyn Courier>,
        )
        .unwrap();
        let handle = map.handle();

        // Two players with overlapping vision footprints.
        let a = player(Vec3::new(0.0, 0.0, 0.0));
        let b = player(Vec3::new(50.0, 0.0, 50.0));
        let (a_id, b_id) = (a.id, b.id);
        handle.enqueue_add(a);
        handle.enqueue_add(b);
        handle.enqueue_broadcast(b"hello".to_vec());
        map.tick(Instant::now());

        let mut delivered = recorder.0.lock().clone();
        delivered.sort();
        let mut expected = vec![a_id, b_id];
        expected.sort();
        assert_eq!(delivered, expected);
    }

    #[test]
    fn visible_player_round_trip_restores_observer_set() {
        let mut map = instance();
        let watcher = EntityId::new();
        let before = map.cell_observers(CellCoord::new(4, 4));

        map.grid_add_visible_player(4, 4, watcher);
        assert!(map.cell_observers(CellCoord::new(4, 4)).contains(&watcher));
        map.grid_remove_visible_player(4, 4, watcher);
        assert_eq!(map.cell_observers(CellCoord::new(4, 4)), before);
    }

    #[test]
    fn player_relocation_shifts_observed_cells() {
        let mut map = instance();
        let handle = map.handle();
        let entity = player(Vec3::new(50.0, 0.0, 50.0)).with_vision_range(100.0);
        let id = entity.id;
        handle.enqueue_add(entity);
        map.tick(Instant::now());
        // vision 100 / cell 100 -> one cell reach around (0,0)
        assert!(map.cell_observers(CellCoord::new(1, 1)).contains(&id));
        assert!(!map.cell_observers(CellCoord::new(9, 9)).contains(&id));

        let pending = handle.enqueue_relocate(id, Vec3::new(950.0, 0.0, 950.0));
        map.tick(Instant::now());
        pending.wait().unwrap().unwrap();
        assert!(!map.cell_observers(CellCoord::new(1, 1)).contains(&id));
        assert!(map.cell_observers(CellCoord::new(9, 9)).contains(&id));
    }

    #[test]
    fn lifecycle_drains_then_destroys_after_grace() {
        let mut map = instance();
        let t0 = Instant::now();
        map.tick(t0);
        assert_eq!(map.lifecycle(), Lifecycle::Draining);

        map.tick(t0 + GRACE / 2);
        assert_eq!(map.lifecycle(), Lifecycle::Draining);

        map.tick(t0 + GRACE);
        assert_eq!(map.lifecycle(), Lifecycle::Destroyed);
    }

    #[test]
    fn entity_entering_during_drain_reactivates() {
        let mut map = instance();
        let handle = map.handle();
        let t0 = Instant::now();
        map.tick(t0);
        assert_eq!(map.lifecycle(), Lifecycle::Draining);

        handle.enqueue_add(npc(Vec3::ZERO));
        // Even at grace expiry, the add applies first and cancels draining.
        map.tick(t0 + GRACE);
        assert_eq!(map.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn desync_marks_instance_unhealthy() {
        let mut map = instance();
        let handle = map.handle();
        let entity = npc(Vec3::ZERO);
        let id = entity.id;
        let cell = CellCoord::new(0, 0);
        handle.enqueue_add(entity);
        map.tick(Instant::now());

        // Corrupt the grid behind the table's back.
        map.grid.remove(id, cell).unwrap();
        handle.enqueue_remove(id);
        map.tick(Instant::now());
        assert!(!map.is_healthy());
        assert!(!map.handle().is_healthy());
    }

    #[test]
    fn invoke_runs_on_the_tick_path() {
        let mut map = instance();
        let handle = map.handle();
        handle.enqueue_add(npc(Vec3::ZERO));
        // Enqueued after the add, so it observes the add applied.
        let pending = handle.invoke(|map| map.entity_count());
        map.tick(Instant::now());
        assert_eq!(pending.wait().unwrap(), 1);
    }

    #[test]
    fn tick_drives_public_events() {
        let mut map = instance();
        let event = PublicEventId(7);
        let team = TeamId(1);
        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);

        let events = map.public_events_mut();
        events.set_finish_listener(move |id, winner| sink.lock().push((id, winner)));
        events
            .register(PublicEvent::new(event, [team], ScoreThreshold(3)))
            .unwrap();
        events.start(event).unwrap();
        events.add_score(event, team, 3);

        map.tick(Instant::now());
        assert_eq!(finished.lock().as_slice(), &[(event, team)]);

        // Further ticks do not re-fire.
        map.tick(Instant::now());
        assert_eq!(finished.lock().len(), 1);
    }

    #[test]
    fn status_atomics_track_ticks() {
        let mut map = instance();
        let handle = map.handle();
        handle.enqueue_add(npc(Vec3::ZERO));
        assert_eq!(handle.entity_count(), 0); // not yet ticked
        map.tick(Instant::now());
        assert_eq!(handle.entity_count(), 1);
        assert_eq!(handle.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn resurrection_policy_is_static() {
        let map = instance();
        assert_eq!(map.resurrection_policy(), ResurrectionPolicy::NearestSpawn);
    }
}
