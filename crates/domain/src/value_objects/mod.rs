//! Value objects - Immutable objects defined by their attributes

mod perk;
mod power_sheet;
mod stat_update;
mod status;
mod turn_result;

// Character stat block
pub use power_sheet::{
    Ability, Attribute, Attributes, PowerSheet, ATTRIBUTE_MAX, ATTRIBUTE_MIN, MAX_HP_PER_LEVEL,
};

// Status/Perk resolution
pub use perk::{append_perks, Perk};
pub use status::{merge_statuses, tick_statuses, StatusEffect};

// Mutation unit
pub use stat_update::{NewPerk, StatChanges, StatUpdate};

// Validated narrative outcome
pub use turn_result::{Choice, ChoiceLabel, ResolvedTurn, RiskLevel, TurnResult};
