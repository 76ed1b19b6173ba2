//! Stat Resolution Engine - applies validated stat deltas to power sheets.

use std::collections::HashMap;
use std::sync::Arc;

use powertale_domain::{
    append_perks, merge_statuses, tick_statuses, CharacterId, NewPerk, PowerSheet, SessionId,
    StatChanges, StatUpdate, StatsSnapshot, TurnId,
};

use crate::infrastructure::ports::{CharacterRepo, ClockPort, RepoError, SnapshotRepo, TurnRepo};

#[derive(Debug, thiserror::Error)]
pub enum StatResolutionError {
    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// `floor(action_count / frequency) + 1`.
pub fn expected_level(action_count: u64, frequency: u64) -> u32 {
    let level = action_count / frequency.max(1) + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Apply one set of changes to a sheet in place.
///
/// Order is hp, level, attributes, statuses (merge then a single tick), perks.
pub fn apply_changes(sheet: &mut PowerSheet, changes: &StatChanges) {
    if let Some(delta) = changes.hp {
        sheet.apply_hp_delta(delta);
    }
    if let Some(level) = changes.level {
        sheet.set_level(level);
    }
    if let Some(attributes) = &changes.attributes {
        sheet.attributes.merge(attributes);
    }

    let incoming = changes.statuses.as_deref().unwrap_or_default();
    sheet.statuses = tick_statuses(merge_statuses(&sheet.statuses, incoming));

    if let Some(new_perks) = &changes.new_perks {
        let unlocked: Vec<_> = new_perks
            .iter()
            .cloned()
            .map(|perk| perk.into_perk(sheet.level))
            .collect();
        append_perks(&mut sheet.perks, &unlocked);
    }
}

pub struct StatResolutionEngine {
    characters: Arc<dyn CharacterRepo>,
    snapshots: Arc<dyn SnapshotRepo>,
    turns: Arc<dyn TurnRepo>,
    clock: Arc<dyn ClockPort>,
    level_up_frequency: u64,
}

impl StatResolutionEngine {
    pub fn new(
        characters: Arc<dyn CharacterRepo>,
        snapshots: Arc<dyn SnapshotRepo>,
        turns: Arc<dyn TurnRepo>,
        clock: Arc<dyn ClockPort>,
        level_up_frequency: u64,
    ) -> Self {
        Self {
            characters,
            snapshots,
            turns,
            clock,
            level_up_frequency: level_up_frequency.max(1),
        }
    }

    /// Apply `changes` to one character, persist it, and record a snapshot.
    pub async fn apply_stat_update(
        &self,
        character_id: CharacterId,
        changes: &StatChanges,
        session_id: SessionId,
        turn_id: TurnId,
    ) -> Result<PowerSheet, StatResolutionError> {
        self.mutate(character_id, session_id, turn_id, |sheet| {
            apply_changes(sheet, changes)
        })
        .await
    }

    /// Raise a character one level with a freshly generated perk.
    ///
    /// Runs after the turn's batch, so statuses are left alone; they were
    /// already ticked once this turn.
    pub async fn apply_level_up(
        &self,
        character_id: CharacterId,
        perk: NewPerk,
        session_id: SessionId,
        turn_id: TurnId,
    ) -> Result<PowerSheet, StatResolutionError> {
        self.mutate(character_id, session_id, turn_id, move |sheet| {
            let new_level = sheet.level.saturating_add(1);
            sheet.set_level(new_level);
            append_perks(&mut sheet.perks, &[perk.into_perk(new_level)]);
        })
        .await
    }

    async fn mutate<F>(
        &self,
        character_id: CharacterId,
        session_id: SessionId,
        turn_id: TurnId,
        change: F,
    ) -> Result<PowerSheet, StatResolutionError>
    where
        F: FnOnce(&mut PowerSheet) + Send,
    {
        let mut character = self
            .characters
            .get(character_id)
            .await?
            .ok_or(StatResolutionError::CharacterNotFound(character_id))?;

        let before_hp = character.sheet.hp;
        change(&mut character.sheet);
        self.characters.save(&character).await?;

        let snapshot = StatsSnapshot::capture(
            character_id,
            session_id,
            turn_id,
            &character.sheet,
            self.clock.now(),
        );
        self.snapshots.save(&snapshot).await?;

        tracing::debug!(
            character_id = %character_id,
            turn_id = %turn_id,
            hp_before = before_hp,
            hp_after = character.sheet.hp,
            level = character.sheet.level,
            "Applied stat update"
        );
        if before_hp > 0 && character.sheet.is_dead() {
            tracing::info!(character_id = %character_id, session_id = %session_id, "Character died");
        }

        Ok(character.sheet)
    }

    /// Whether the owner's completed action count has outgrown the character's level.
    pub async fn should_level_up(&self, character_id: CharacterId) -> Result<bool, StatResolutionError> {
        let character = self
            .characters
            .get(character_id)
            .await?
            .ok_or(StatResolutionError::CharacterNotFound(character_id))?;
        let count = self
            .turns
            .count_completed_for_player(character.session_id, character.owner_id)
            .await?;
        Ok(expected_level(count, self.level_up_frequency) > character.sheet.level)
    }

    /// Apply every update independently; failures are logged and skipped.
    pub async fn process_batch(
        &self,
        updates: &[StatUpdate],
        session_id: SessionId,
        turn_id: TurnId,
    ) -> HashMap<CharacterId, PowerSheet> {
        let mut applied = HashMap::new();
        for update in updates {
            let character_id = match update.character_id.trim().parse::<CharacterId>() {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!(
                        character_id = %update.character_id,
                        turn_id = %turn_id,
                        "Skipping stat update for unrecognized character reference"
                    );
                    continue;
                }
            };
            match self
                .apply_stat_update(character_id, &update.changes, session_id, turn_id)
                .await
            {
                Ok(sheet) => {
                    applied.insert(character_id, sheet);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        character_id = %character_id,
                        turn_id = %turn_id,
                        "Skipping failed stat update"
                    );
                }
            }
        }
        applied
    }

    /// Progression history of a character, oldest first.
    pub async fn history(&self, character_id: CharacterId) -> Result<Vec<StatsSnapshot>, StatResolutionError> {
        Ok(self.snapshots.list_for_character(character_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::ports::{MockCharacterRepo, MockSnapshotRepo, MockTurnRepo};
    use crate::test_fixtures::seed_active_session;
    use chrono::Utc;
    use powertale_domain::{Attribute, Character, StatusEffect, Turn, UserId};

    fn engine(store: &Arc<InMemoryStore>) -> StatResolutionEngine {
        StatResolutionEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock(Utc::now())),
            3,
        )
    }

    async fn character(store: &Arc<InMemoryStore>, hp: u32, max_hp: u32) -> Character {
        let mut sheet = PowerSheet::new(max_hp, Default::default(), vec![], "Sunlight").unwrap();
        sheet.hp = hp;
        let character = Character::new(SessionId::new(), UserId::new(), "Blazekin", sheet);
        CharacterRepo::save(store.as_ref(), &character).await.unwrap();
        character
    }

    #[test]
    fn expected_level_follows_frequency() {
        assert_eq!(expected_level(0, 3), 1);
        assert_eq!(expected_level(2, 3), 1);
        assert_eq!(expected_level(3, 3), 2);
        assert_eq!(expected_level(7, 3), 3);
        assert_eq!(expected_level(5, 0), 6);
    }

    #[tokio::test]
    async fn hp_is_clamped_and_snapshot_recorded() {
        let store = Arc::new(InMemoryStore::new());
        let c = character(&store, 100, 120).await;
        let engine = engine(&store);
        let turn_id = TurnId::new();

        let sheet = engine
            .apply_stat_update(c.id, &StatChanges::default().with_hp(-86), c.session_id, turn_id)
            .await
            .unwrap();
        assert_eq!(sheet.hp, 14);

        let sheet = engine
            .apply_stat_update(c.id, &StatChanges::default().with_hp(-999), c.session_id, turn_id)
            .await
            .unwrap();
        assert_eq!(sheet.hp, 0);

        let history = engine.history(c.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].hp, 14);
        assert_eq!(history[1].hp, 0);
        assert!(history.iter().all(|s| s.turn_id == turn_id));

        let stored = CharacterRepo::get(store.as_ref(), c.id).await.unwrap().unwrap();
        assert_eq!(stored.sheet.hp, 0);
    }

    #[tokio::test]
    async fn level_change_scales_max_hp_and_carries_into_hp() {
        let store = Arc::new(InMemoryStore::new());
        let c = character(&store, 50, 100).await;

        let sheet = engine(&store)
            .apply_stat_update(c.id, &StatChanges::default().with_level(3), c.session_id, TurnId::new())
            .await
            .unwrap();
        assert_eq!(sheet.level, 3);
        assert_eq!(sheet.max_hp, 120);
        assert_eq!(sheet.hp, 70);
    }

    #[test]
    fn extreme_level_keeps_hp_within_max() {
        for level in [429_496_724, u32::MAX] {
            let mut sheet = PowerSheet::new(100, Default::default(), vec![], "Water").unwrap();
            sheet.hp = 50;

            apply_changes(&mut sheet, &StatChanges::default().with_level(level));
            assert_eq!(sheet.level, level);
            assert!(sheet.hp <= sheet.max_hp, "hp {} above max {}", sheet.hp, sheet.max_hp);

            apply_changes(&mut sheet, &StatChanges::default().with_hp(-1_000_000).with_level(1));
            assert!(sheet.hp <= sheet.max_hp);
        }
    }

    #[test]
    fn status_with_one_turn_left_expires_on_the_same_apply() {
        let mut sheet = PowerSheet::new(100, Default::default(), vec![], "Water").unwrap();
        sheet.statuses = vec![StatusEffect::new("Burning", 2)];

        let changes = StatChanges::default().with_status(StatusEffect::new("Stunned", 1));
        apply_changes(&mut sheet, &changes);
        assert_eq!(sheet.statuses, vec![StatusEffect::new("Burning", 1)]);

        apply_changes(&mut sheet, &StatChanges::default());
        assert!(sheet.statuses.is_empty());
    }

    #[test]
    fn refreshed_status_keeps_longer_duration_then_ticks_once() {
        let mut sheet = PowerSheet::new(100, Default::default(), vec![], "Water").unwrap();
        sheet.statuses = vec![StatusEffect::new("Shielded", 4)];

        apply_changes(
            &mut sheet,
            &StatChanges::default().with_status(StatusEffect::new("Shielded", 2)),
        );
        assert_eq!(sheet.statuses, vec![StatusEffect::new("Shielded", 3)]);
    }

    #[test]
    fn attributes_merge_shallowly_and_perks_default_to_new_level() {
        let mut sheet = PowerSheet::new(100, Default::default(), vec![], "Water").unwrap();
        let changes = StatChanges::default()
            .with_level(2)
            .with_attribute(Attribute::Strength, 250)
            .with_perk(NewPerk::new("Second Wind", "Recover once per fight"));

        apply_changes(&mut sheet, &changes);
        assert_eq!(sheet.attributes.get(Attribute::Strength), 100);
        assert_eq!(sheet.attributes.get(Attribute::Speed), 10);
        assert_eq!(sheet.perks.len(), 1);
        assert_eq!(sheet.perks[0].unlocked_at_level, 2);
    }

    #[tokio::test]
    async fn missing_character_is_an_error() {
        let store = Arc::new(InMemoryStore::new());
        let err = engine(&store)
            .apply_stat_update(CharacterId::new(), &StatChanges::default(), SessionId::new(), TurnId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StatResolutionError::CharacterNotFound(_)));
    }

    #[tokio::test]
    async fn batch_skips_bad_references_and_keeps_going() {
        let store = Arc::new(InMemoryStore::new());
        let a = character(&store, 100, 100).await;
        let b = character(&store, 100, 100).await;

        let updates = vec![
            StatUpdate::new(a.id.to_string(), StatChanges::default().with_hp(-10)),
            StatUpdate::new("Nobody", StatChanges::default().with_hp(-10)),
            StatUpdate::new(CharacterId::new().to_string(), StatChanges::default().with_hp(-10)),
            StatUpdate::new(b.id.to_string(), StatChanges::default().with_hp(-20)),
        ];

        let applied = engine(&store)
            .process_batch(&updates, a.session_id, TurnId::new())
            .await;
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[&a.id].hp, 90);
        assert_eq!(applied[&b.id].hp, 80);
    }

    #[tokio::test]
    async fn batch_survives_storage_failure_on_one_character() {
        let good = CharacterId::new();
        let bad = CharacterId::new();
        let sheet = PowerSheet::new(100, Default::default(), vec![], "Salt").unwrap();
        let stored = Character::new(SessionId::new(), UserId::new(), "Tidecaller", sheet).with_id(good);

        let mut characters = MockCharacterRepo::new();
        characters.expect_get().returning(move |id| {
            if id == bad {
                Err(RepoError::database("get character", "connection reset"))
            } else {
                Ok(Some(stored.clone()))
            }
        });
        characters.expect_save().times(1).returning(|_| Ok(()));
        let mut snapshots = MockSnapshotRepo::new();
        snapshots.expect_save().times(1).returning(|_| Ok(()));

        let engine = StatResolutionEngine::new(
            Arc::new(characters),
            Arc::new(snapshots),
            Arc::new(MockTurnRepo::new()),
            Arc::new(FixedClock(Utc::now())),
            3,
        );
        let updates = vec![
            StatUpdate::new(bad.to_string(), StatChanges::default().with_hp(-5)),
            StatUpdate::new(good.to_string(), StatChanges::default().with_hp(-5)),
        ];
        let applied = engine.process_batch(&updates, SessionId::new(), TurnId::new()).await;
        assert_eq!(applied.keys().collect::<Vec<_>>(), vec![&good]);
    }

    #[tokio::test]
    async fn level_up_follows_completed_action_count() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_active_session(&store, &[100]).await;
        let owner = seeded.users[0];
        let character_id = seeded.characters[0];
        let engine = engine(&store);

        for index in 1..=2 {
            let mut turn = Turn::begin(seeded.session_id, index, owner, None, Utc::now());
            turn.mark_resolving().unwrap();
            turn.complete("story", Utc::now()).unwrap();
            TurnRepo::save(store.as_ref(), &turn).await.unwrap();
        }
        assert!(!engine.should_level_up(character_id).await.unwrap());

        let mut turn = Turn::begin(seeded.session_id, 3, owner, None, Utc::now());
        turn.mark_resolving().unwrap();
        turn.complete("story", Utc::now()).unwrap();
        TurnRepo::save(store.as_ref(), &turn).await.unwrap();
        assert!(engine.should_level_up(character_id).await.unwrap());
    }

    #[tokio::test]
    async fn level_up_adds_perk_without_ticking_statuses() {
        let store = Arc::new(InMemoryStore::new());
        let mut c = character(&store, 80, 100).await;
        c.sheet.statuses = vec![StatusEffect::new("Burning", 1)];
        CharacterRepo::save(store.as_ref(), &c).await.unwrap();

        let sheet = engine(&store)
            .apply_level_up(c.id, NewPerk::new("Ember Heart", "Immune to fire"), c.session_id, TurnId::new())
            .await
            .unwrap();
        assert_eq!(sheet.level, 2);
        assert_eq!(sheet.max_hp, 110);
        assert_eq!(sheet.hp, 90);
        assert_eq!(sheet.perks[0].unlocked_at_level, 2);
        assert_eq!(sheet.statuses, vec![StatusEffect::new("Burning", 1)]);
    }
}
