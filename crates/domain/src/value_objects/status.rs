//! Timed status effects and their merge/decay rules.

use serde::{Deserialize, Serialize};

/// A timed buff or debuff whose duration decays once per resolved turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffect {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Remaining turns, always > 0 while the status is held
    #[serde(alias = "durationInTurns")]
    pub duration: u32,
    #[serde(default)]
    pub effect: String,
}

impl StatusEffect {
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            duration,
            effect: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = effect.into();
        self
    }
}

/// Merge incoming statuses into the current list.
///
/// A status sharing a name with a held one refreshes it to the longer of the
/// two durations; new names are appended. Order of held statuses is kept.
pub fn merge_statuses(current: &[StatusEffect], incoming: &[StatusEffect]) -> Vec<StatusEffect> {
    let mut merged = current.to_vec();
    for status in incoming {
        match merged.iter_mut().find(|held| held.name == status.name) {
            Some(held) => held.duration = held.duration.max(status.duration),
            None => merged.push(status.clone()),
        }
    }
    merged
}

/// Decay every status by one turn, dropping the ones that run out.
pub fn tick_statuses(statuses: Vec<StatusEffect>) -> Vec<StatusEffect> {
    statuses
        .into_iter()
        .filter_map(|mut status| {
            status.duration = status.duration.saturating_sub(1);
            (status.duration > 0).then_some(status)
        })
        .collect()
}
