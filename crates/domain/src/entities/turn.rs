//! Turn entity - one attempt to resolve a round for the active player.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{SessionId, TurnId, UserId};

/// Lifecycle phase of a turn.
///
/// ```text
/// Pending -> Resolving -> Completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnPhase {
    Pending,
    Resolving,
    Completed,
}

impl TurnPhase {
    /// Pending and resolving turns block new submissions.
    pub fn is_in_flight(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: TurnId,
    pub session_id: SessionId,
    /// Monotonic within the session
    pub turn_index: u64,
    pub active_player_id: UserId,
    pub phase: TurnPhase,
    /// Freeform text the player submitted, if any
    pub action: Option<String>,
    /// Story text once the turn completed
    pub narrative: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn begin(
        session_id: SessionId,
        turn_index: u64,
        active_player_id: UserId,
        action: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TurnId::new(),
            session_id,
            turn_index,
            active_player_id,
            phase: TurnPhase::Pending,
            action,
            narrative: None,
            started_at: now,
            completed_at: None,
        }
    }

    pub fn mark_resolving(&mut self) -> Result<(), DomainError> {
        if self.phase != TurnPhase::Pending {
            return Err(DomainError::invalid_state_transition(format!(
                "turn {} cannot start resolving from {:?}",
                self.id, self.phase
            )));
        }
        self.phase = TurnPhase::Resolving;
        Ok(())
    }

    pub fn complete(&mut self, narrative: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.phase != TurnPhase::Resolving {
            return Err(DomainError::invalid_state_transition(format!(
                "turn {} cannot complete from {:?}",
                self.id, self.phase
            )));
        }
        self.phase = TurnPhase::Completed;
        self.narrative = Some(narrative.into());
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase.is_in_flight()
    }

    /// An in-flight turn older than `max_age` is an anomaly to be discarded.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.is_in_flight() && now - self.started_at > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> Turn {
        Turn::begin(SessionId::new(), 1, UserId::new(), None, Utc::now())
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut t = turn();
        assert!(t.complete("too early", Utc::now()).is_err());
        t.mark_resolving().unwrap();
        assert!(t.mark_resolving().is_err());
        t.complete("The bridge collapses.", Utc::now()).unwrap();
        assert_eq!(t.phase, TurnPhase::Completed);
        assert!(!t.is_in_flight());
        assert!(t.completed_at.is_some());
    }

    #[test]
    fn stale_only_when_in_flight_and_old() {
        let mut t = turn();
        let later = t.started_at + Duration::seconds(31);
        assert!(t.is_stale(later, Duration::seconds(30)));
        assert!(!t.is_stale(t.started_at + Duration::seconds(5), Duration::seconds(30)));

        t.mark_resolving().unwrap();
        t.complete("done", later).unwrap();
        assert!(!t.is_stale(later + Duration::minutes(10), Duration::seconds(30)));
    }
}
