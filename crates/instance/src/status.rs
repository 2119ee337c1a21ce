use glam::Vec3;
use gridhost_common::{EntityId, InstanceKey};
use gridhost_queue::{CommandSender, CompletionHandle, completion};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use uuid::Uuid;

use crate::command::{Command, MapError};
use crate::entity::Entity;
use crate::map::MapInstance;

/// Coarse instance lifecycle as observed through the status atomics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Draining,
    Destroyed,
}

impl Lifecycle {
    pub(crate) fn code(self) -> u8 {
        match self {
            Lifecycle::Active => 0,
            Lifecycle::Draining => 1,
            Lifecycle::Destroyed => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            0 => Lifecycle::Active,
            1 => Lifecycle::Draining,
            _ => Lifecycle::Destroyed,
        }
    }
}

/// Status published by the tick thread after every tick. The only instance
/// state other threads may read directly.
#[derive(Debug)]
pub struct MapStatus {
    lifecycle: AtomicU8,
    healthy: AtomicBool,
    entities: AtomicUsize,
}

impl MapStatus {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: AtomicU8::new(Lifecycle::Active.code()),
            healthy: AtomicBool::new(true),
            entities: AtomicUsize::new(0),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_code(self.lifecycle.load(Ordering::Acquire))
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, lifecycle: Lifecycle, entities: usize) {
        self.lifecycle.store(lifecycle.code(), Ordering::Release);
        self.entities.store(entities, Ordering::Release);
    }

    /// Sticky: once unhealthy, always unhealthy.
    pub(crate) fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }
}

/// Cheap cloneable producer-side handle to a map instance.
///
/// Safe from any thread. Mutations are enqueued for the tick thread;
/// `invoke` routes arbitrary work (including reads) through the same
/// command path, preserving ordering with earlier mutations.
#[derive(Debug, Clone)]
pub struct MapHandle {
    key: InstanceKey,
    uid: Uuid,
    sender: CommandSender<Command>,
    status: Arc<MapStatus>,
}

impl MapHandle {
    pub(crate) fn new(
        key: InstanceKey,
        uid: Uuid,
        sender: CommandSender<Command>,
        status: Arc<MapStatus>,
    ) -> Self {
        Self {
            key,
            uid,
            sender,
            status,
        }
    }

    pub fn key(&self) -> &InstanceKey {
        &self.key
    }

    /// Identity of the underlying instance. Two handles refer to the same
    /// instance iff their uids are equal.
    pub fn instance_uid(&self) -> Uuid {
        self.uid
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.status.lifecycle()
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// Entity count as of the last completed tick.
    pub fn entity_count(&self) -> usize {
        self.status.entity_count()
    }

    /// Queue an entity for insertion. Returns `false` if the instance is
    /// gone and the command was discarded.
    pub fn enqueue_add(&self, entity: Entity) -> bool {
        self.sender.enqueue(Command::Add(entity))
    }

    /// Queue an entity for removal. Removal is idempotent at apply time.
    pub fn enqueue_remove(&self, id: EntityId) -> bool {
        self.sender.enqueue(Command::Remove(id))
    }

    /// Queue a relocation. The returned handle resolves with the committed
    /// position, which may differ from the request; waiting on it blocks
    /// only the caller, never the tick thread.
    pub fn enqueue_relocate(
        &self,
        id: EntityId,
        target: Vec3,
    ) -> CompletionHandle<Result<Vec3, MapError>> {
        let (completer, handle) = completion();
        // If the enqueue fails the completer is dropped here and the waiter
        // observes a stall, matching a dead tick loop.
        self.sender.enqueue(Command::Relocate {
            id,
            target,
            completion: completer,
        });
        handle
    }

    /// Queue an opaque payload for fan-out to every observing player.
    pub fn enqueue_broadcast(&self, payload: Vec<u8>) -> bool {
        self.sender.enqueue(Command::Broadcast(payload))
    }

    /// Run a closure on the tick thread against the authoritative state and
    /// receive its result.
    pub fn invoke<R, F>(&self, f: F) -> CompletionHandle<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut MapInstance) -> R + Send + 'static,
    {
        let (completer, handle) = completion();
        self.sender.enqueue(Command::Invoke(Box::new(move |map| {
            completer.complete(f(map));
        })));
        handle
    }
}
