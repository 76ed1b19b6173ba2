//! Character entity - a player's avatar and its power sheet.

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, SessionId, UserId};
use crate::value_objects::PowerSheet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: CharacterId,
    pub session_id: SessionId,
    /// Owning player's user id
    pub owner_id: UserId,
    pub name: String,
    pub sheet: PowerSheet,
}

impl Character {
    pub fn new(session_id: SessionId, owner_id: UserId, name: impl Into<String>, sheet: PowerSheet) -> Self {
        Self {
            id: CharacterId::new(),
            session_id,
            owner_id,
            name: name.into(),
            sheet,
        }
    }

    pub fn with_id(mut self, id: CharacterId) -> Self {
        self.id = id;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.sheet.is_alive()
    }
}
