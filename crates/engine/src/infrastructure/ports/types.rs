//! Data types carried across the external ports.

use serde::{Deserialize, Serialize};

use powertale_domain::{
    Character, CharacterId, Choice, PowerSheet, SessionId, StatUpdate, Turn, TurnId, UserId,
};

// =============================================================================
// Narrative collaborator input
// =============================================================================

/// A character as the narrative collaborator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterBrief {
    pub id: CharacterId,
    pub name: String,
    pub owner_id: UserId,
    pub sheet: PowerSheet,
}

impl From<&Character> for CharacterBrief {
    fn from(character: &Character) -> Self {
        Self {
            id: character.id,
            name: character.name.clone(),
            owner_id: character.owner_id,
            sheet: character.sheet.clone(),
        }
    }
}

/// One completed turn in the recent event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogEntry {
    pub turn_index: u64,
    pub active_player_id: UserId,
    pub action: Option<String>,
    pub narrative: String,
}

impl EventLogEntry {
    pub fn from_turn(turn: &Turn) -> Option<Self> {
        turn.narrative.as_ref().map(|narrative| Self {
            turn_index: turn.turn_index,
            active_player_id: turn.active_player_id,
            action: turn.action.clone(),
            narrative: narrative.clone(),
        })
    }
}

/// Everything the collaborator receives to produce a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeContext {
    pub session_id: SessionId,
    pub turn_index: u64,
    pub active_player_id: UserId,
    pub active_character_id: Option<CharacterId>,
    pub characters: Vec<CharacterBrief>,
    pub recent_events: Vec<EventLogEntry>,
    pub action: Option<String>,
}

/// Request for a perk when a character levels up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerkContext {
    pub session_id: SessionId,
    pub character: CharacterBrief,
    pub new_level: u32,
}

// =============================================================================
// Notification channel output
// =============================================================================

/// Events published on the real-time channel after successful operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    #[serde(rename = "game:started", rename_all = "camelCase")]
    GameStarted {
        turn_order: Vec<UserId>,
        current_player_id: UserId,
    },
    #[serde(rename = "game:ended")]
    GameEnded,
    #[serde(rename = "turn:changed", rename_all = "camelCase")]
    TurnChanged {
        current_player_id: UserId,
        turn_index: usize,
    },
    #[serde(rename = "turn:resolved", rename_all = "camelCase")]
    TurnResolved {
        turn_id: TurnId,
        narrative: String,
        choices: Vec<Choice>,
        applied_updates: Vec<StatUpdate>,
    },
    #[serde(rename = "turn:rejected", rename_all = "camelCase")]
    TurnRejected { user_id: UserId, reason: String },
}
