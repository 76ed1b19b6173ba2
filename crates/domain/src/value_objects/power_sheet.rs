//! PowerSheet - the full mutable stat block of a character.
//!
//! Every mutator on this type keeps the sheet inside its invariants:
//! `level >= 1`, `max_hp >= 1`, `0 <= hp <= max_hp`, attributes in
//! `1..=100`. A sheet with `hp == 0` is dead.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::perk::Perk;
use super::status::StatusEffect;
use crate::error::DomainError;

/// Lowest and highest value an attribute may hold.
pub const ATTRIBUTE_MIN: i32 = 1;
pub const ATTRIBUTE_MAX: i32 = 100;

/// Max HP gained (or lost) per level changed.
pub const MAX_HP_PER_LEVEL: i64 = 10;

/// The five named attributes of a power sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Strength,
    Speed,
    Durability,
    Intelligence,
    Energy,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Speed => "speed",
            Self::Durability => "durability",
            Self::Intelligence => "intelligence",
            Self::Energy => "energy",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strength" | "str" => Ok(Self::Strength),
            "speed" | "spd" => Ok(Self::Speed),
            "durability" | "dur" => Ok(Self::Durability),
            "intelligence" | "int" => Ok(Self::Intelligence),
            "energy" | "nrg" => Ok(Self::Energy),
            other => Err(DomainError::validation(format!("unknown attribute: {other}"))),
        }
    }
}

/// Attribute scores, each clamped to `ATTRIBUTE_MIN..=ATTRIBUTE_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    pub strength: i32,
    pub speed: i32,
    pub durability: i32,
    pub intelligence: i32,
    pub energy: i32,
}

impl Attributes {
    pub fn uniform(value: i32) -> Self {
        let value = clamp_attribute(value);
        Self {
            strength: value,
            speed: value,
            durability: value,
            intelligence: value,
            energy: value,
        }
    }

    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Speed => self.speed,
            Attribute::Durability => self.durability,
            Attribute::Intelligence => self.intelligence,
            Attribute::Energy => self.energy,
        }
    }

    pub fn set(&mut self, attribute: Attribute, value: i32) {
        let value = clamp_attribute(value);
        match attribute {
            Attribute::Strength => self.strength = value,
            Attribute::Speed => self.speed = value,
            Attribute::Durability => self.durability = value,
            Attribute::Intelligence => self.intelligence = value,
            Attribute::Energy => self.energy = value,
        }
    }

    /// Shallow merge: only the provided keys change.
    pub fn merge(&mut self, changes: &BTreeMap<Attribute, i32>) {
        for (attribute, value) in changes {
            self.set(*attribute, *value);
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self::uniform(10)
    }
}

fn clamp_attribute(value: i32) -> i32 {
    value.clamp(ATTRIBUTE_MIN, ATTRIBUTE_MAX)
}

/// A named power with a strength rating and optional cooldown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    pub name: String,
    pub description: String,
    /// 1-10
    pub power_level: u8,
    /// Cooldown in turns, `None` when the ability is always available
    pub cooldown: Option<u32>,
}

impl Ability {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        power_level: u8,
        cooldown: Option<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            power_level: power_level.clamp(1, 10),
            cooldown,
        }
    }
}

/// The full stat block of a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerSheet {
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub attributes: Attributes,
    pub abilities: Vec<Ability>,
    pub weakness: String,
    pub statuses: Vec<StatusEffect>,
    pub perks: Vec<Perk>,
}

impl PowerSheet {
    /// Build a fresh level-1 sheet at full health.
    pub fn new(
        max_hp: u32,
        attributes: Attributes,
        abilities: Vec<Ability>,
        weakness: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let weakness = weakness.into();
        if weakness.trim().is_empty() {
            return Err(DomainError::validation("weakness cannot be empty"));
        }
        if max_hp == 0 {
            return Err(DomainError::validation("max_hp must be greater than zero"));
        }
        Ok(Self {
            level: 1,
            hp: max_hp,
            max_hp,
            attributes,
            abilities,
            weakness,
            statuses: Vec::new(),
            perks: Vec::new(),
        })
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    /// `hp = clamp(hp + delta, 0, max_hp)`.
    ///
    /// A dead sheet does not heal; revival is not a stat delta.
    pub fn apply_hp_delta(&mut self, delta: i64) {
        if self.is_dead() && delta > 0 {
            return;
        }
        let next = (self.hp as i64).saturating_add(delta);
        self.hp = next.clamp(0, self.max_hp as i64) as u32;
    }

    /// Set the level directly, shifting `max_hp` by `MAX_HP_PER_LEVEL` per level
    /// changed and carrying the same absolute change into current `hp`.
    pub fn set_level(&mut self, new_level: u32) {
        let new_level = new_level.max(1);
        let level_delta = new_level as i64 - self.level as i64;
        self.level = new_level;
        if level_delta == 0 {
            return;
        }

        let hp_delta = level_delta.saturating_mul(MAX_HP_PER_LEVEL);
        let new_max = (self.max_hp as i64)
            .saturating_add(hp_delta)
            .clamp(1, u32::MAX as i64);
        self.max_hp = new_max as u32;

        if self.is_dead() {
            return;
        }
        let new_hp = (self.hp as i64).saturating_add(hp_delta).clamp(0, new_max);
        self.hp = new_hp as u32;
    }

    pub fn has_status(&self, name: &str) -> bool {
        self.statuses.iter().any(|s| s.name == name)
    }
}
