//! Narrative Response Validator - the boundary between untrusted collaborator
//! output and the engine.
//!
//! Decodes a raw JSON value into a closed [`TurnResult`]. Structural problems
//! are hard errors; a character referenced by name instead of id is repaired
//! when the name matches exactly (ignoring case).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use powertale_domain::{
    Attribute, Character, CharacterId, Choice, ChoiceLabel, NewPerk,
    ResolvedTurn, RiskLevel, StatChanges, StatUpdate, StatusEffect, TurnResult,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrativeValidationError {
    #[error("Response is not a JSON object")]
    NotAnObject,
    #[error("Field 'valid' must be a boolean")]
    InvalidFlag,
    #[error("Rejected action is missing 'validationError'")]
    MissingRejectionReason,
    #[error("Missing or empty 'narrative'")]
    MissingNarrative,
    #[error("Field 'choices' must be an array")]
    ChoicesNotArray,
    #[error("Expected exactly 4 choices, got {0}")]
    WrongChoiceCount(usize),
    #[error("Choice {index} must be labeled {expected}, found {found:?}")]
    ChoiceLabelMismatch {
        index: usize,
        expected: ChoiceLabel,
        found: String,
    },
    #[error("Choice {0} is missing a description")]
    MissingChoiceDescription(ChoiceLabel),
    #[error("Choice {label} has invalid riskLevel {value:?}")]
    InvalidRiskLevel { label: ChoiceLabel, value: String },
    #[error("Field 'statUpdates' must be an array")]
    StatUpdatesNotArray,
    #[error("statUpdates[{0}] must be an object")]
    StatUpdateNotObject(usize),
    #[error("statUpdates[{0}] is missing 'characterId'")]
    MissingCharacterId(usize),
    #[error("statUpdates[{0}] is missing a 'changes' object")]
    MissingChanges(usize),
    #[error("statUpdates[{index}].changes.{field} must be {expected}")]
    InvalidField {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
    #[error("statUpdates[{index}] has an invalid status: {reason}")]
    InvalidStatus { index: usize, reason: String },
    #[error("statUpdates[{index}] has an invalid perk: {reason}")]
    InvalidPerk { index: usize, reason: String },
}

/// A character the collaborator may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownCharacter {
    pub id: CharacterId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    pub all_characters: Vec<KnownCharacter>,
}

impl ValidationContext {
    pub fn from_characters(characters: &[Character]) -> Self {
        Self {
            all_characters: characters
                .iter()
                .map(|c| KnownCharacter {
                    id: c.id,
                    name: c.name.clone(),
                })
                .collect(),
        }
    }

    fn id_for_name(&self, name: &str) -> Option<CharacterId> {
        let wanted = name.trim().to_lowercase();
        self.all_characters
            .iter()
            .find(|c| c.name.trim().to_lowercase() == wanted)
            .map(|c| c.id)
    }
}

type Result<T> = std::result::Result<T, NarrativeValidationError>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NarrativeResponseValidator;

impl NarrativeResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw: &Value, context: &ValidationContext) -> Result<TurnResult> {
        let object = raw.as_object().ok_or(NarrativeValidationError::NotAnObject)?;

        let valid = match object.get("valid") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(NarrativeValidationError::InvalidFlag),
        };
        if !valid {
            let reason = non_empty_str(object.get("validationError"))
                .ok_or(NarrativeValidationError::MissingRejectionReason)?;
            return Ok(TurnResult::Rejected {
                reason: reason.to_string(),
            });
        }

        let narrative = non_empty_str(object.get("narrative"))
            .ok_or(NarrativeValidationError::MissingNarrative)?
            .to_string();
        let choices = parse_choices(object.get("choices"))?;
        let stat_updates = parse_stat_updates(object.get("statUpdates"), context)?;

        Ok(TurnResult::Resolved(ResolvedTurn {
            narrative,
            choices,
            stat_updates,
        }))
    }

    /// Validate a generated level-up perk: `{name, description}`, both non-empty.
    pub fn validate_perk(&self, raw: &Value) -> Result<NewPerk> {
        let object = raw.as_object().ok_or(NarrativeValidationError::NotAnObject)?;
        let name = non_empty_str(object.get("name")).ok_or_else(|| {
            NarrativeValidationError::InvalidPerk {
                index: 0,
                reason: "missing name".to_string(),
            }
        })?;
        let description = non_empty_str(object.get("description")).ok_or_else(|| {
            NarrativeValidationError::InvalidPerk {
                index: 0,
                reason: "missing description".to_string(),
            }
        })?;
        Ok(NewPerk::new(name, description))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_choices(raw: Option<&Value>) -> Result<[Choice; 4]> {
    let entries = raw
        .and_then(Value::as_array)
        .ok_or(NarrativeValidationError::ChoicesNotArray)?;
    if entries.len() != ChoiceLabel::ORDER.len() {
        return Err(NarrativeValidationError::WrongChoiceCount(entries.len()));
    }

    let mut parsed = Vec::with_capacity(4);
    for (index, (entry, expected)) in entries.iter().zip(ChoiceLabel::ORDER).enumerate() {
        let found = entry
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if found != expected.as_str() {
            return Err(NarrativeValidationError::ChoiceLabelMismatch {
                index,
                expected,
                found: found.to_string(),
            });
        }
        let description = non_empty_str(entry.get("description"))
            .ok_or(NarrativeValidationError::MissingChoiceDescription(expected))?;
        let risk_raw = entry
            .get("riskLevel")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let risk_level: RiskLevel =
            risk_raw
                .parse()
                .map_err(|_| NarrativeValidationError::InvalidRiskLevel {
                    label: expected,
                    value: risk_raw.to_string(),
                })?;
        parsed.push(Choice {
            label: expected,
            description: description.to_string(),
            risk_level,
        });
    }

    parsed
        .try_into()
        .map_err(|v: Vec<Choice>| NarrativeValidationError::WrongChoiceCount(v.len()))
}

fn parse_stat_updates(raw: Option<&Value>, context: &ValidationContext) -> Result<Vec<StatUpdate>> {
    let entries = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(NarrativeValidationError::StatUpdatesNotArray),
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_stat_update(index, entry, context))
        .collect()
}

fn parse_stat_update(index: usize, entry: &Value, context: &ValidationContext) -> Result<StatUpdate> {
    let object = entry
        .as_object()
        .ok_or(NarrativeValidationError::StatUpdateNotObject(index))?;
    let raw_id = non_empty_str(object.get("characterId"))
        .ok_or(NarrativeValidationError::MissingCharacterId(index))?;
    let changes = object
        .get("changes")
        .and_then(Value::as_object)
        .ok_or(NarrativeValidationError::MissingChanges(index))?;

    let character_id = repair_character_id(raw_id, context);
    Ok(StatUpdate::new(character_id, parse_changes(index, changes)?))
}

/// Swap a character name for its id when the collaborator used the name.
///
/// Ids in any UUID spelling come back in canonical form.
fn repair_character_id(raw_id: &str, context: &ValidationContext) -> String {
    if let Ok(id) = raw_id.trim().parse::<CharacterId>() {
        return id.to_string();
    }
    match context.id_for_name(raw_id) {
        Some(id) => {
            tracing::warn!(
                reference = %raw_id,
                character_id = %id,
                "Repaired stat update that referenced a character by name"
            );
            id.to_string()
        }
        None => {
            tracing::debug!(reference = %raw_id, "Stat update references no known character");
            raw_id.to_string()
        }
    }
}

fn parse_changes(index: usize, changes: &Map<String, Value>) -> Result<StatChanges> {
    let invalid = |field: &'static str, expected: &'static str| NarrativeValidationError::InvalidField {
        index,
        field,
        expected,
    };

    let hp = present(changes.get("hp"))
        .map(|v| as_integer(v).ok_or_else(|| invalid("hp", "a number")))
        .transpose()?;

    let level = present(changes.get("level"))
        .map(|v| {
            as_integer(v)
                .map(|n| n.clamp(1, u32::MAX as i64) as u32)
                .ok_or_else(|| invalid("level", "a number"))
        })
        .transpose()?;

    let attributes = present(changes.get("attributes"))
        .map(|v| {
            v.as_object()
                .ok_or_else(|| invalid("attributes", "an object"))
                .and_then(|map| parse_attributes(map, &invalid))
        })
        .transpose()?;

    let statuses: Option<Vec<StatusEffect>> = present(changes.get("statuses"))
        .map(|v| {
            v.as_array()
                .ok_or_else(|| invalid("statuses", "an array"))
                .and_then(|list| list.iter().map(|s| parse_status(index, s)).collect())
        })
        .transpose()?;

    let new_perks: Option<Vec<NewPerk>> = present(changes.get("newPerks"))
        .map(|v| {
            v.as_array()
                .ok_or_else(|| invalid("newPerks", "an array"))
                .and_then(|list| list.iter().map(|p| parse_perk(index, p)).collect())
        })
        .transpose()?;

    Ok(StatChanges {
        hp,
        level,
        attributes,
        statuses,
        new_perks,
    })
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

fn parse_attributes<F>(map: &Map<String, Value>, invalid: &F) -> Result<BTreeMap<Attribute, i32>>
where
    F: Fn(&'static str, &'static str) -> NarrativeValidationError,
{
    let mut attributes = BTreeMap::new();
    for (key, value) in map {
        let number = as_integer(value).ok_or_else(|| invalid("attributes", "an object of numbers"))?;
        match key.parse::<Attribute>() {
            Ok(attribute) => {
                attributes.insert(attribute, number.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
            }
            Err(_) => {
                tracing::warn!(attribute = %key, "Dropping unknown attribute from stat update");
            }
        }
    }
    Ok(attributes)
}

fn parse_status(index: usize, raw: &Value) -> Result<StatusEffect> {
    let invalid = |reason: &str| NarrativeValidationError::InvalidStatus {
        index,
        reason: reason.to_string(),
    };
    let object = raw.as_object().ok_or_else(|| invalid("not an object"))?;
    let name = non_empty_str(object.get("name")).ok_or_else(|| invalid("missing name"))?;
    let duration = present(object.get("duration"))
        .or_else(|| present(object.get("durationInTurns")))
        .and_then(Value::as_i64)
        .filter(|d| *d >= 1)
        .ok_or_else(|| invalid("duration must be an integer of at least 1"))?;

    let mut status = StatusEffect::new(name, u32::try_from(duration).unwrap_or(u32::MAX));
    if let Some(description) = optional_str(object, "description").map_err(|_| invalid("description must be text"))? {
        status = status.with_description(description);
    }
    if let Some(effect) = optional_str(object, "effect").map_err(|_| invalid("effect must be text"))? {
        status = status.with_effect(effect);
    }
    Ok(status)
}

fn parse_perk(index: usize, raw: &Value) -> Result<NewPerk> {
    let invalid = |reason: &str| NarrativeValidationError::InvalidPerk {
        index,
        reason: reason.to_string(),
    };
    let object = raw.as_object().ok_or_else(|| invalid("not an object"))?;
    let name = non_empty_str(object.get("name")).ok_or_else(|| invalid("missing name"))?;
    let description = optional_str(object, "description")
        .map_err(|_| invalid("description must be text"))?
        .unwrap_or_default();

    let mut perk = NewPerk::new(name, description);
    perk.unlocked_at_level = match present(object.get("unlockedAtLevel")) {
        None => None,
        Some(v) => Some(
            v.as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| invalid("unlockedAtLevel must be a positive integer"))?,
        ),
    };
    Ok(perk)
}

/// `Ok(None)` when absent, `Err(())` when present but not a string.
fn optional_str<'a>(object: &'a Map<String, Value>, key: &str) -> std::result::Result<Option<&'a str>, ()> {
    match present(object.get(key)) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(()),
    }
}
