//! Public events: per-instance competitive objectives over teams.
//!
//! An event moves Pending -> Active -> Finished. The win condition is
//! content-injected; the coordinator selects exactly one winning team,
//! notifies a registered finish listener exactly once, and ignores every
//! score update after that.
//!
//! # Invariants
//! - Finished is terminal; the winner is set once and never changes.
//! - The finish listener fires at most once per event.
//! - Tie-breaks are deterministic: lowest team id wins.

mod coordinator;

pub use coordinator::{
    EventCoordinator, EventError, EventState, PublicEvent, PublicEventId, ScoreThreshold, Team,
    TeamId, WinCondition,
};

pub fn crate_info() -> &'static str {
    "gridhost-event v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("event"));
    }
}
