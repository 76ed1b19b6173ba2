//! Turn resolution use case.
//!
//! One submission runs, under the session's lock: permission check, narrative
//! request with retries, validation, stat application, optional level-up,
//! turn completion, and advancement.

mod validator;

pub use validator::{
    KnownCharacter, NarrativeResponseValidator, NarrativeValidationError, ValidationContext,
};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use powertale_domain::{
    Character, CharacterId, Choice, DomainError, PowerSheet, ResolvedTurn, SessionId, StatChanges,
    StatUpdate, Turn, TurnId, TurnResult, UserId,
};

use crate::entities::{
    can_submit_action, Advancement, PermissionDenied, PermissionGuard, SequencerError,
    StatResolutionEngine, TurnSequencer,
};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::ports::{
    CharacterBrief, CharacterRepo, ClockPort, EventLogEntry, GameEvent, NarrativeContext,
    NarrativeError, NarrativePort, NotificationPort, PerkContext, RepoError, TurnRepo,
};
use crate::infrastructure::retry::RetryPolicy;
use crate::infrastructure::session_locks::SessionLocks;

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Denied(#[from] PermissionDenied),
    #[error("A turn is already in progress for session {0}")]
    TurnInProgress(SessionId),
    #[error("Narrative generation failed after {attempts} attempts: {last_error}")]
    CollaboratorExhausted { attempts: u32, last_error: String },
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Why a single narrative attempt failed.
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Collaborator(#[from] NarrativeError),
    #[error("contract violation: {0}")]
    Contract(#[from] NarrativeValidationError),
}

/// Knobs the orchestrator reads from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSettings {
    pub narrative_timeout: Duration,
    pub retry: RetryPolicy,
    pub stale_turn_timeout: Duration,
    pub recent_event_limit: usize,
}

impl From<&EngineConfig> for TurnSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            narrative_timeout: config.narrative_timeout,
            retry: config.retry.clone(),
            stale_turn_timeout: config.stale_turn_timeout,
            recent_event_limit: config.recent_event_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The collaborator refused the action; the same player may try again.
    Rejected { reason: String },
    Resolved(TurnResolution),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnResolution {
    pub turn_id: TurnId,
    pub narrative: String,
    pub choices: [Choice; 4],
    /// Updates that were actually applied, level-up included
    pub applied_updates: Vec<StatUpdate>,
    pub sheets: HashMap<CharacterId, PowerSheet>,
    /// `None` when nobody is left alive to take the next turn
    pub next: Option<Advancement>,
}

pub struct TurnUseCases {
    pub submit: Arc<TurnOrchestrator>,
}

impl TurnUseCases {
    pub fn new(submit: Arc<TurnOrchestrator>) -> Self {
        Self { submit }
    }
}

pub struct TurnOrchestrator {
    guard: Arc<PermissionGuard>,
    sequencer: Arc<TurnSequencer>,
    stats: Arc<StatResolutionEngine>,
    characters: Arc<dyn CharacterRepo>,
    turns: Arc<dyn TurnRepo>,
    narrative: Arc<dyn NarrativePort>,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn ClockPort>,
    locks: Arc<SessionLocks>,
    settings: TurnSettings,
    validator: NarrativeResponseValidator,
}

impl TurnOrchestrator {
    pub fn new(
        guard: Arc<PermissionGuard>,
        sequencer: Arc<TurnSequencer>,
        stats: Arc<StatResolutionEngine>,
        characters: Arc<dyn CharacterRepo>,
        turns: Arc<dyn TurnRepo>,
        narrative: Arc<dyn NarrativePort>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn ClockPort>,
        locks: Arc<SessionLocks>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            guard,
            sequencer,
            stats,
            characters,
            turns,
            narrative,
            notifier,
            clock,
            locks,
            settings,
            validator: NarrativeResponseValidator::new(),
        }
    }

    /// Resolve one action submission for the session's active player.
    pub async fn execute(
        &self,
        session_id: SessionId,
        user_id: UserId,
        action: Option<String>,
    ) -> Result<TurnOutcome, TurnError> {
        let _lock = self
            .locks
            .try_acquire(session_id)
            .ok_or(TurnError::TurnInProgress(session_id))?;

        if let Some(discarded) = self
            .sequencer
            .reset_stale_turns(session_id, self.settings.stale_turn_timeout)
            .await?
        {
            tracing::warn!(session_id = %session_id, turn_id = %discarded, "Recovered stale turn");
        }
        if let Some(in_flight) = self.turns.find_in_flight(session_id).await? {
            tracing::info!(
                session_id = %session_id,
                turn_id = %in_flight.id,
                "Submission rejected, turn in progress"
            );
            return Err(TurnError::TurnInProgress(session_id));
        }

        self.guard
            .check(session_id, user_id, can_submit_action)
            .await?
            .enforce()?;

        let turn_index = self.turns.latest_turn_index(session_id).await? + 1;
        let mut turn = Turn::begin(session_id, turn_index, user_id, action, self.clock.now());
        self.turns.save(&turn).await?;

        let result = self.resolve(&mut turn).await;
        if result.is_err() && turn.is_in_flight() {
            if let Err(e) = self.turns.delete(turn.id).await {
                tracing::error!(error = %e, turn_id = %turn.id, "Failed to discard failed turn");
            }
        }
        result
    }

    async fn resolve(&self, turn: &mut Turn) -> Result<TurnOutcome, TurnError> {
        let session_id = turn.session_id;
        turn.mark_resolving()?;
        self.turns.save(turn).await?;

        let characters = self.characters.list_in_session(session_id).await?;
        let context = self.build_context(turn, &characters).await?;
        let validation = ValidationContext::from_characters(&characters);

        let resolved = match self.request_turn(&context, &validation).await? {
            TurnResult::Rejected { reason } => {
                self.turns.delete(turn.id).await?;
                tracing::info!(
                    session_id = %session_id,
                    user_id = %turn.active_player_id,
                    reason = %reason,
                    "Action rejected by narrator"
                );
                self.notifier
                    .publish(
                        session_id,
                        GameEvent::TurnRejected {
                            user_id: turn.active_player_id,
                            reason: reason.clone(),
                        },
                    )
                    .await;
                return Ok(TurnOutcome::Rejected { reason });
            }
            TurnResult::Resolved(resolved) => resolved,
        };

        let ResolvedTurn {
            narrative,
            choices,
            stat_updates,
        } = resolved;

        let mut applied_updates = in_session_updates(stat_updates, &characters, turn.id);
        let mut sheets = self
            .stats
            .process_batch(&applied_updates, session_id, turn.id)
            .await;
        applied_updates.retain(|update| {
            update
                .character_id
                .parse::<CharacterId>()
                .is_ok_and(|id| sheets.contains_key(&id))
        });

        turn.complete(narrative.clone(), self.clock.now())?;
        self.turns.save(turn).await?;

        let active_character = characters
            .iter()
            .find(|c| c.owner_id == turn.active_player_id);
        if let Some(character) = active_character {
            if let Some((update, sheet)) = self.level_up(character, &applied_updates, turn).await {
                sheets.insert(character.id, sheet);
                applied_updates.push(update);
            }
        }

        let next = match self.sequencer.advance(session_id).await {
            Ok(advancement) => Some(advancement),
            Err(SequencerError::NoAlivePlayers) => {
                tracing::warn!(session_id = %session_id, "No alive players remain after turn");
                None
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            session_id = %session_id,
            turn_id = %turn.id,
            turn_index = turn.turn_index,
            updates = applied_updates.len(),
            "Turn resolved"
        );
        self.notifier
            .publish(
                session_id,
                GameEvent::TurnResolved {
                    turn_id: turn.id,
                    narrative: narrative.clone(),
                    choices: choices.to_vec(),
                    applied_updates: applied_updates.clone(),
                },
            )
            .await;

        Ok(TurnOutcome::Resolved(TurnResolution {
            turn_id: turn.id,
            narrative,
            choices,
            applied_updates,
            sheets,
            next,
        }))
    }

    async fn build_context(
        &self,
        turn: &Turn,
        characters: &[Character],
    ) -> Result<NarrativeContext, TurnError> {
        let recent_events = self
            .turns
            .list_recent_completed(turn.session_id, self.settings.recent_event_limit)
            .await?
            .iter()
            .filter_map(EventLogEntry::from_turn)
            .collect();

        Ok(NarrativeContext {
            session_id: turn.session_id,
            turn_index: turn.turn_index,
            active_player_id: turn.active_player_id,
            active_character_id: characters
                .iter()
                .find(|c| c.owner_id == turn.active_player_id)
                .map(|c| c.id),
            characters: characters.iter().map(CharacterBrief::from).collect(),
            recent_events,
            action: turn.action.clone(),
        })
    }

    /// Ask for a turn until it validates or the retry policy gives up.
    async fn request_turn(
        &self,
        context: &NarrativeContext,
        validation: &ValidationContext,
    ) -> Result<TurnResult, TurnError> {
        let policy = &self.settings.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt_turn(context, validation).await {
                Ok(result) => return Ok(result),
                Err(e) if policy.should_retry(attempt) => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        session_id = %context.session_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Narrative attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %context.session_id,
                        attempt,
                        error = %e,
                        "Narrative attempts exhausted"
                    );
                    return Err(TurnError::CollaboratorExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
            }
        }
    }

    async fn attempt_turn(
        &self,
        context: &NarrativeContext,
        validation: &ValidationContext,
    ) -> Result<TurnResult, AttemptError> {
        let timeout = self.settings.narrative_timeout;
        let raw = tokio::time::timeout(timeout, self.narrative.generate_turn(context))
            .await
            .map_err(|_| NarrativeError::Timeout(timeout))??;
        Ok(self.validator.validate(&raw, validation)?)
    }

    /// Level the active character up when its action count calls for it.
    ///
    /// Skipped when the batch already set that character's level. Any failure
    /// here is logged and leaves the turn intact.
    async fn level_up(
        &self,
        character: &Character,
        applied: &[StatUpdate],
        turn: &Turn,
    ) -> Option<(StatUpdate, PowerSheet)> {
        let explicit_level = applied.iter().any(|u| {
            u.changes.level.is_some()
                && u.character_id.trim().parse::<CharacterId>().ok() == Some(character.id)
        });
        if explicit_level {
            return None;
        }

        match self.stats.should_level_up(character.id).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(error = %e, character_id = %character.id, "Level-up check failed");
                return None;
            }
        }

        let current = match self.characters.get(character.id).await {
            Ok(Some(current)) if current.is_alive() => current,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(error = %e, character_id = %character.id, "Level-up load failed");
                return None;
            }
        };
        let new_level = current.sheet.level.saturating_add(1);
        let context = PerkContext {
            session_id: turn.session_id,
            character: CharacterBrief::from(&current),
            new_level,
        };

        let timeout = self.settings.narrative_timeout;
        let perk = match tokio::time::timeout(timeout, self.narrative.generate_perk(&context)).await {
            Ok(Ok(raw)) => match self.validator.validate_perk(&raw) {
                Ok(perk) => perk,
                Err(e) => {
                    tracing::warn!(error = %e, character_id = %character.id, "Generated perk rejected");
                    return None;
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, character_id = %character.id, "Perk generation failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(character_id = %character.id, "Perk generation timed out");
                return None;
            }
        };

        let mut unlocked = perk.clone();
        unlocked.unlocked_at_level = Some(new_level);
        match self
            .stats
            .apply_level_up(character.id, perk, turn.session_id, turn.id)
            .await
        {
            Ok(sheet) => {
                tracing::info!(character_id = %character.id, level = sheet.level, "Character leveled up");
                let update = StatUpdate::new(
                    character.id.to_string(),
                    StatChanges::default().with_level(sheet.level).with_perk(unlocked),
                );
                Some((update, sheet))
            }
            Err(e) => {
                tracing::warn!(error = %e, character_id = %character.id, "Level-up apply failed");
                None
            }
        }
    }
}

/// Keep updates that name a character of this session; warn about the rest.
fn in_session_updates(
    updates: Vec<StatUpdate>,
    characters: &[Character],
    turn_id: TurnId,
) -> Vec<StatUpdate> {
    let known: HashSet<CharacterId> = characters.iter().map(|c| c.id).collect();
    updates
        .into_iter()
        .filter(|update| {
            let in_session = update
                .character_id
                .trim()
                .parse::<CharacterId>()
                .is_ok_and(|id| known.contains(&id));
            if !in_session {
                tracing::warn!(
                    character_id = %update.character_id,
                    turn_id = %turn_id,
                    "Skipping stat update for character outside the session"
                );
            }
            in_session
        })
        .collect()
}
