//! Perks - permanent, level-gated enhancements.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Perk {
    pub name: String,
    pub description: String,
    pub unlocked_at_level: u32,
}

impl Perk {
    pub fn new(name: impl Into<String>, description: impl Into<String>, unlocked_at_level: u32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unlocked_at_level,
        }
    }
}

/// Append newly unlocked perks verbatim.
///
/// Perks arrive unique from generation, so no deduplication happens here.
pub fn append_perks(current: &mut Vec<Perk>, unlocked: &[Perk]) {
    current.extend_from_slice(unlocked);
}
