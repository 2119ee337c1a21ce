use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an entity resident on a map instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse entity classification used by search filtering and visibility.
///
/// Players are the only entities that observe cells; everything else is
/// observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Npc,
    Prop,
}

impl EntityKind {
    pub fn is_player(self) -> bool {
        matches!(self, EntityKind::Player)
    }
}

/// Key identifying one live map instance: a map definition id plus an
/// optional discriminator (party id, queue id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub definition_id: String,
    pub discriminator: Option<String>,
}

impl InstanceKey {
    pub fn new(definition_id: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            discriminator: None,
        }
    }

    pub fn with_discriminator(
        definition_id: impl Into<String>,
        discriminator: impl Into<String>,
    ) -> Self {
        Self {
            definition_id: definition_id.into(),
            discriminator: Some(discriminator.into()),
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discriminator {
            Some(disc) => write!(f, "{}/{}", self.definition_id, disc),
            None => write!(f, "{}", self.definition_id),
        }
    }
}

/// Static per-instance respawn classification.
///
/// Consumed by an external respawn subsystem; the core only stores and
/// reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResurrectionPolicy {
    /// Respawning is not permitted on this map.
    Disabled,
    /// Respawn at the nearest designated spawn location.
    NearestSpawn,
    /// Respawn where the entity died.
    InPlace,
}
