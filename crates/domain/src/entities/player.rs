//! Player entity - a user's seat in one game session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, SessionId, UserId};

/// Role of a player in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PlayerRole {
    /// Created the session; controls lifecycle and settings
    Host,
    #[default]
    Member,
}

impl PlayerRole {
    pub fn is_host(&self) -> bool {
        matches!(self, PlayerRole::Host)
    }
}

impl std::fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerRole::Host => write!(f, "host"),
            PlayerRole::Member => write!(f, "member"),
        }
    }
}

/// A user seated in a session, optionally owning one character.
///
/// Players are keyed by `(session_id, user_id)`; the user id is also the
/// identifier used in the session's turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub role: PlayerRole,
    pub character_id: Option<CharacterId>,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(session_id: SessionId, user_id: UserId, role: PlayerRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            user_id,
            role,
            character_id: None,
            joined_at,
        }
    }

    pub fn with_character(mut self, character_id: CharacterId) -> Self {
        self.character_id = Some(character_id);
        self
    }

    pub fn has_character(&self) -> bool {
        self.character_id.is_some()
    }
}
