use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one public event within an instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PublicEventId(pub u32);

/// Identifier of one competing team.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team-{}", self.0)
    }
}

/// One competing team and its accrued score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub score: u64,
}

/// Lifecycle of a public event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventState {
    Pending,
    Active,
    Finished,
}

/// Content-defined winning condition, evaluated per team.
pub trait WinCondition: Send {
    fn met(&self, team: &Team) -> bool;
}

/// Win when a team's score reaches the threshold.
#[derive(Debug, Clone, Copy)]
pub struct ScoreThreshold(pub u64);

impl WinCondition for ScoreThreshold {
    fn met(&self, team: &Team) -> bool {
        team.score >= self.0
    }
}

impl<F> WinCondition for F
where
    F: Fn(&Team) -> bool + Send,
{
    fn met(&self, team: &Team) -> bool {
        self(team)
    }
}

/// Errors from event registration and control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event {0:?} already registered")]
    DuplicateEvent(PublicEventId),
    #[error("event {0:?} not registered")]
    UnknownEvent(PublicEventId),
    #[error("event {0:?} is not pending")]
    NotPending(PublicEventId),
}

/// One public event: ordered teams, injected win condition, single winner.
pub struct PublicEvent {
    pub id: PublicEventId,
    state: EventState,
    teams: BTreeMap<TeamId, Team>,
    winner: Option<TeamId>,
    condition: Box<dyn WinCondition>,
}

impl PublicEvent {
    pub fn new(
        id: PublicEventId,
        teams: impl IntoIterator<Item = TeamId>,
        condition: impl WinCondition + 'static,
    ) -> Self {
        Self {
            id,
            state: EventState::Pending,
            teams: teams
                .into_iter()
                .map(|id| (id, Team { id, score: 0 }))
                .collect(),
            winner: None,
            condition: Box::new(condition),
        }
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    pub fn winner(&self) -> Option<TeamId> {
        self.winner
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    /// First team in id order meeting the win condition, if any.
    fn winning_team(&self) -> Option<TeamId> {
        self.teams
            .values()
            .find(|team| self.condition.met(team))
            .map(|team| team.id)
    }
}

impl fmt::Debug for PublicEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicEvent")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("teams", &self.teams)
            .field("winner", &self.winner)
            .finish_non_exhaustive()
    }
}

type FinishListener = Box<dyn FnMut(PublicEventId, TeamId) + Send>;

/// Per-instance coordinator over public events.
///
/// Owned by a map instance and driven from its tick thread; score writes and
/// listener dispatch are therefore serialized with all other instance state.
#[derive(Default)]
pub struct EventCoordinator {
    events: BTreeMap<PublicEventId, PublicEvent>,
    finish_listener: Option<FinishListener>,
}

impl EventCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single finish listener, replacing any previous one.
    pub fn set_finish_listener(
        &mut self,
        listener: impl FnMut(PublicEventId, TeamId) + Send + 'static,
    ) {
        self.finish_listener = Some(Box::new(listener));
    }

    pub fn register(&mut self, event: PublicEvent) -> Result<(), EventError> {
        let id = event.id;
        if self.events.contains_key(&id) {
            return Err(EventError::DuplicateEvent(id));
        }
        tracing::debug!(event = id.0, "public event registered");
        self.events.insert(id, event);
        Ok(())
    }

    /// Transition a pending event to Active.
    pub fn start(&mut self, id: PublicEventId) -> Result<(), EventError> {
        let event = self.events.get_mut(&id).ok_or(EventError::UnknownEvent(id))?;
        if event.state != EventState::Pending {
            return Err(EventError::NotPending(id));
        }
        event.state = EventState::Active;
        tracing::info!(event = id.0, "public event started");
        Ok(())
    }

    /// Accrue score for a team. Updates on non-active events (including
    /// finished ones) are ignored.
    pub fn add_score(&mut self, id: PublicEventId, team: TeamId, delta: u64) {
        let Some(event) = self.events.get_mut(&id) else {
            tracing::debug!(event = id.0, "score update for unknown event ignored");
            return;
        };
        if event.state != EventState::Active {
            tracing::debug!(
                event = id.0,
                state = ?event.state,
                "score update outside Active ignored"
            );
            return;
        }
        if let Some(team) = event.teams.get_mut(&team) {
            team.score = team.score.saturating_add(delta);
        }
    }

    /// Evaluate win conditions for every Active event, finishing those whose
    /// condition is met and invoking the finish listener once per finished
    /// event. Returns the events finished by this pass.
    pub fn update(&mut self) -> Vec<(PublicEventId, TeamId)> {
        let mut finished = Vec::new();
        for event in self.events.values_mut() {
            if event.state != EventState::Active {
                continue;
            }
            if let Some(winner) = event.winning_team() {
                event.state = EventState::Finished;
                event.winner = Some(winner);
                tracing::info!(event = event.id.0, %winner, "public event finished");
                finished.push((event.id, winner));
            }
        }
        if let Some(listener) = self.finish_listener.as_mut() {
            for &(id, winner) in &finished {
                listener(id, winner);
            }
        }
        finished
    }

    pub fn get(&self, id: PublicEventId) -> Option<&PublicEvent> {
        self.events.get(&id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events. Used when a fresh instance is created for a key.
    pub fn reset(&mut self) {
        self.events.clear();
    }
}

impl fmt::Debug for EventCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCoordinator")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
