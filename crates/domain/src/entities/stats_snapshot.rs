//! Immutable point-in-time copy of a character's progression stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, SessionId, SnapshotId, TurnId};
use crate::value_objects::{Attributes, Perk, PowerSheet, StatusEffect};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub id: SnapshotId,
    pub character_id: CharacterId,
    pub session_id: SessionId,
    pub turn_id: TurnId,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub attributes: Attributes,
    pub statuses: Vec<StatusEffect>,
    pub perks: Vec<Perk>,
    pub created_at: DateTime<Utc>,
}

impl StatsSnapshot {
    pub fn capture(
        character_id: CharacterId,
        session_id: SessionId,
        turn_id: TurnId,
        sheet: &PowerSheet,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SnapshotId::new(),
            character_id,
            session_id,
            turn_id,
            level: sheet.level,
            hp: sheet.hp,
            max_hp: sheet.max_hp,
            attributes: sheet.attributes,
            statuses: sheet.statuses.clone(),
            perks: sheet.perks.clone(),
            created_at,
        }
    }
}
