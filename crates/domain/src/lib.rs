extern crate self as powertale_domain;

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use aggregates::{GameSession, SessionStatus, SessionValidation, DEFAULT_MAX_PLAYERS};

pub use entities::{Character, Player, PlayerRole, StatsSnapshot, Turn, TurnPhase};

pub use error::{DomainError, TurnOrderError};

// Re-export ID types
pub use ids::{CharacterId, SessionId, SnapshotId, TurnId, UserId};

// Re-export value objects (explicit list in value_objects/mod.rs)
pub use value_objects::{
    append_perks, merge_statuses, tick_statuses, Ability, Attribute, Attributes, Choice,
    ChoiceLabel, NewPerk, Perk, PowerSheet, ResolvedTurn, RiskLevel, StatChanges, StatUpdate,
    StatusEffect, TurnResult, ATTRIBUTE_MAX, ATTRIBUTE_MIN, MAX_HP_PER_LEVEL,
};
