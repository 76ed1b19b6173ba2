//! StatUpdate - the unit of mutation applied to one character's PowerSheet.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::perk::Perk;
use super::power_sheet::Attribute;
use super::status::StatusEffect;

/// An instruction to mutate one character's PowerSheet.
///
/// `character_id` is kept as text: updates come from an untrusted source and
/// may still reference something that is not a character of the session.
/// Consumers resolve and filter it before applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatUpdate {
    pub character_id: String,
    pub changes: StatChanges,
}

impl StatUpdate {
    pub fn new(character_id: impl Into<String>, changes: StatChanges) -> Self {
        Self {
            character_id: character_id.into(),
            changes,
        }
    }
}

/// Optional changes; absent fields leave the sheet untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatChanges {
    /// Signed HP delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<i64>,
    /// Absolute new level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<Attribute, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<StatusEffect>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_perks: Option<Vec<NewPerk>>,
}

impl StatChanges {
    pub fn with_hp(mut self, delta: i64) -> Self {
        self.hp = Some(delta);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute, value: i32) -> Self {
        self.attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(attribute, value);
        self
    }

    pub fn with_status(mut self, status: StatusEffect) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_perk(mut self, perk: NewPerk) -> Self {
        self.new_perks.get_or_insert_with(Vec::new).push(perk);
        self
    }
}

/// A perk proposed by the narrative collaborator.
///
/// The unlock level is optional on the wire; it defaults to the character's
/// level after the update is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerk {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at_level: Option<u32>,
}

impl NewPerk {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unlocked_at_level: None,
        }
    }

    pub fn into_perk(self, default_level: u32) -> Perk {
        Perk {
            name: self.name,
            description: self.description,
            unlocked_at_level: self.unlocked_at_level.unwrap_or(default_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_serialize_in_camel_case_without_absent_fields() {
        let changes = StatChanges::default()
            .with_hp(-5)
            .with_perk(NewPerk::new("Overdrive", "Double speed for a turn"));
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json["hp"], -5);
        assert!(json.get("level").is_none());
        assert_eq!(json["newPerks"][0]["name"], "Overdrive");
    }

    #[test]
    fn new_perk_defaults_unlock_level() {
        let perk = NewPerk::new("Overdrive", "").into_perk(4);
        assert_eq!(perk.unlocked_at_level, 4);
    }
}
