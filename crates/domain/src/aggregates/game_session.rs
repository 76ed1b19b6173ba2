//! GameSession aggregate - turn order, turn pointer, and lifecycle.
//!
//! # Invariants
//!
//! - While `status == Active`, `turn_order` is non-empty and
//!   `current_turn_index < turn_order.len()`.
//! - `turn_order` is frozen once the session leaves the lobby.
//!
//! # Lifecycle
//!
//! ```text
//! Lobby -> Active -> Ended
//! Lobby -> Ended
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Player;
use crate::error::{DomainError, TurnOrderError};
use crate::ids::{SessionId, UserId};

/// Default seat limit for a new session.
pub const DEFAULT_MAX_PLAYERS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Lobby,
    Active,
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Lobby => write!(f, "lobby"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: SessionId,
    pub host_id: UserId,
    pub status: SessionStatus,
    pub turn_order: Vec<UserId>,
    pub current_turn_index: usize,
    pub max_players: usize,
    pub created_at: DateTime<Utc>,
}

/// Result of a structural sanity check on a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl GameSession {
    pub fn new(host_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            host_id,
            status: SessionStatus::Lobby,
            turn_order: Vec::new(),
            current_turn_index: 0,
            max_players: DEFAULT_MAX_PLAYERS,
            created_at,
        }
    }

    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.max_players = max_players.max(1);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_lobby(&self) -> bool {
        self.status == SessionStatus::Lobby
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host_id == user_id
    }

    /// `turn_order[current_turn_index]` while active, otherwise `None`.
    pub fn active_player(&self) -> Option<UserId> {
        if !self.is_active() {
            return None;
        }
        self.turn_order.get(self.current_turn_index).copied()
    }

    /// Index of the next player to act.
    ///
    /// Scans forward from the current index, wrapping once. The current index
    /// is only reselected when its player is the sole survivor.
    pub fn next_active_index(&self, alive: &HashSet<UserId>) -> Result<usize, TurnOrderError> {
        if !self.is_active() {
            return Err(TurnOrderError::GameNotActive);
        }
        let len = self.turn_order.len();
        if len == 0 {
            return Err(TurnOrderError::EmptyTurnOrder);
        }

        (1..=len)
            .map(|offset| (self.current_turn_index + offset) % len)
            .find(|&index| alive.contains(&self.turn_order[index]))
            .ok_or(TurnOrderError::NoAlivePlayers)
    }

    /// Freeze the turn order and make the first seat active.
    pub fn start(&mut self, turn_order: Vec<UserId>) -> Result<(), DomainError> {
        if !self.is_lobby() {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot start a session that is {}",
                self.status
            )));
        }
        if turn_order.is_empty() {
            return Err(DomainError::validation("turn order cannot be empty"));
        }
        self.turn_order = turn_order;
        self.current_turn_index = 0;
        self.status = SessionStatus::Active;
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), DomainError> {
        if self.status == SessionStatus::Ended {
            return Err(DomainError::invalid_state_transition("session already ended"));
        }
        self.status = SessionStatus::Ended;
        Ok(())
    }

    /// Structural check of turn order against the seated players.
    pub fn validate(&self, players: &[Player]) -> SessionValidation {
        let mut errors = Vec::new();
        let seated: HashSet<UserId> = players.iter().map(|p| p.user_id).collect();
        let ordered: HashSet<UserId> = self.turn_order.iter().copied().collect();

        if self.turn_order.is_empty() {
            errors.push("turn order is empty".to_string());
        }
        if ordered.len() != self.turn_order.len() {
            errors.push("turn order contains duplicate players".to_string());
        }
        for user_id in &self.turn_order {
            if !seated.contains(user_id) {
                errors.push(format!("turn order references unknown player {user_id}"));
            }
        }
        for player in players {
            if !ordered.contains(&player.user_id) {
                errors.push(format!("player {} is missing from turn order", player.user_id));
            }
        }
        if !self.turn_order.is_empty() && self.current_turn_index >= self.turn_order.len() {
            errors.push(format!(
                "current turn index {} is out of bounds for {} players",
                self.current_turn_index,
                self.turn_order.len()
            ));
        }

        SessionValidation {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PlayerRole;

    fn active_session(order: &[UserId], index: usize) -> GameSession {
        let mut session = GameSession::new(order[0], Utc::now());
        session.start(order.to_vec()).unwrap();
        session.current_turn_index = index;
        session
    }

    fn alive(ids: &[UserId]) -> HashSet<UserId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn active_player_only_while_active() {
        let a = UserId::new();
        let mut session = GameSession::new(a, Utc::now());
        assert_eq!(session.active_player(), None);
        session.start(vec![a]).unwrap();
        assert_eq!(session.active_player(), Some(a));
        session.end().unwrap();
        assert_eq!(session.active_player(), None);
    }

    #[test]
    fn next_skips_dead_players() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let session = active_session(&[a, b, c], 0);
        assert_eq!(session.next_active_index(&alive(&[a, c])), Ok(2));
    }

    #[test]
    fn next_never_reselects_current_while_others_live() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let session = active_session(&[a, b, c], 1);
        assert_eq!(session.next_active_index(&alive(&[a, b, c])), Ok(2));
        let session = active_session(&[a, b, c], 2);
        assert_eq!(session.next_active_index(&alive(&[a, b, c])), Ok(0));
    }

    #[test]
    fn sole_survivor_wraps_back_to_itself() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let session = active_session(&[a, b, c], 1);
        assert_eq!(session.next_active_index(&alive(&[b])), Ok(1));
    }

    #[test]
    fn no_alive_players_fails() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let session = active_session(&[a, b, c], 0);
        assert_eq!(
            session.next_active_index(&HashSet::new()),
            Err(TurnOrderError::NoAlivePlayers)
        );
    }

    #[test]
    fn next_requires_active_game() {
        let session = GameSession::new(UserId::new(), Utc::now());
        assert_eq!(
            session.next_active_index(&HashSet::new()),
            Err(TurnOrderError::GameNotActive)
        );
    }

    #[test]
    fn start_requires_lobby_and_players() {
        let a = UserId::new();
        let mut session = GameSession::new(a, Utc::now());
        assert!(session.start(vec![]).is_err());
        session.start(vec![a]).unwrap();
        assert!(session.start(vec![a]).is_err());
    }

    #[test]
    fn validate_reports_every_structural_problem() {
        let (a, b, stranger) = (UserId::new(), UserId::new(), UserId::new());
        let sid = SessionId::new();
        let players = vec![
            Player::new(sid, a, PlayerRole::Host, Utc::now()),
            Player::new(sid, b, PlayerRole::Member, Utc::now()),
        ];
        let mut session = active_session(&[a, stranger], 0);
        session.current_turn_index = 5;

        let report = session.validate(&players);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 3);

        let session = active_session(&[a, b], 1);
        assert!(session.validate(&players).valid);
    }
}
