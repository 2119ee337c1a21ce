use glam::Vec3;
use gridhost_common::EntityId;
use gridhost_queue::Completer;

use crate::entity::Entity;
use crate::map::MapInstance;

/// Errors surfaced to producers through relocate completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// The target entity was no longer present when the command was applied.
    #[error("entity {0} not found on map")]
    EntityNotFound(EntityId),
    /// The instance detected a table/grid desync while applying the command
    /// and has been marked unhealthy.
    #[error("map instance invariant violated")]
    InvariantViolation,
}

/// A queued mutation destined for the owning tick thread.
///
/// Once enqueued a command always executes exactly once; there is no
/// cancellation.
pub enum Command {
    /// Insert an entity. A duplicate guid is a caller bug: logged, dropped.
    Add(Entity),
    /// Remove an entity. Idempotent: applying against an absent guid is a
    /// no-op, never an error.
    Remove(EntityId),
    /// Move an entity. The completion is fulfilled with the committed
    /// position, which may differ from the request (terrain resolution).
    Relocate {
        id: EntityId,
        target: Vec3,
        completion: Completer<Result<Vec3, MapError>>,
    },
    /// Fan an opaque payload out to every observing player.
    Broadcast(Vec<u8>),
    /// Run arbitrary work on the tick thread. The documented route for
    /// cross-thread reads against the authoritative state.
    Invoke(Box<dyn FnOnce(&mut MapInstance) + Send>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Add(entity) => f.debug_tuple("Add").field(&entity.id).finish(),
            Command::Remove(id) => f.debug_tuple("Remove").field(id).finish(),
            Command::Relocate { id, target, .. } => f
                .debug_struct("Relocate")
                .field("id", id)
                .field("target", target)
                .finish_non_exhaustive(),
            Command::Broadcast(payload) => {
                f.debug_tuple("Broadcast").field(&payload.len()).finish()
            }
            Command::Invoke(_) => f.write_str("Invoke(..)"),
        }
    }
}
