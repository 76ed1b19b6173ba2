//! Turn Sequencer - whose turn it is, who is still alive, and advancement.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use powertale_domain::{
    Character, CharacterId, GameSession, Player, SessionId, SessionValidation, TurnId,
    TurnOrderError, UserId,
};

use crate::infrastructure::ports::{
    CharacterRepo, ClockPort, GameEvent, NotificationPort, PlayerRepo, RepoError, SessionRepo,
    TurnRepo,
};

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("Game not found: {0}")]
    GameNotFound(SessionId),
    #[error("Game is not active")]
    GameNotActive,
    #[error("Turn order is empty")]
    EmptyTurnOrder,
    #[error("No alive players remain")]
    NoAlivePlayers,
    #[error("Turn pointer of session {0} moved concurrently")]
    Conflict(SessionId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<TurnOrderError> for SequencerError {
    fn from(err: TurnOrderError) -> Self {
        match err {
            TurnOrderError::GameNotActive => Self::GameNotActive,
            TurnOrderError::EmptyTurnOrder => Self::EmptyTurnOrder,
            TurnOrderError::NoAlivePlayers => Self::NoAlivePlayers,
        }
    }
}

/// Result of a successful advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advancement {
    pub index: usize,
    pub active_player: UserId,
}

/// Players whose character exists and has hp above zero.
pub fn alive_players(players: &[Player], characters: &[Character]) -> HashSet<UserId> {
    let by_id: HashMap<CharacterId, &Character> = characters.iter().map(|c| (c.id, c)).collect();
    players
        .iter()
        .filter(|player| {
            player
                .character_id
                .and_then(|id| by_id.get(&id))
                .is_some_and(|character| character.is_alive())
        })
        .map(|player| player.user_id)
        .collect()
}

pub struct TurnSequencer {
    sessions: Arc<dyn SessionRepo>,
    players: Arc<dyn PlayerRepo>,
    characters: Arc<dyn CharacterRepo>,
    turns: Arc<dyn TurnRepo>,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn ClockPort>,
}

impl TurnSequencer {
    pub fn new(
        sessions: Arc<dyn SessionRepo>,
        players: Arc<dyn PlayerRepo>,
        characters: Arc<dyn CharacterRepo>,
        turns: Arc<dyn TurnRepo>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            sessions,
            players,
            characters,
            turns,
            notifier,
            clock,
        }
    }

    async fn load(&self, session_id: SessionId) -> Result<GameSession, SequencerError> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or(SequencerError::GameNotFound(session_id))
    }

    pub async fn active_player(&self, session_id: SessionId) -> Result<Option<UserId>, SequencerError> {
        Ok(self.load(session_id).await?.active_player())
    }

    pub async fn alive_players(&self, session_id: SessionId) -> Result<HashSet<UserId>, SequencerError> {
        let players = self.players.list_in_session(session_id).await?;
        let characters = self.characters.list_in_session(session_id).await?;
        Ok(alive_players(&players, &characters))
    }

    /// Move the turn pointer to the next alive player.
    ///
    /// Persists with compare-and-swap against the index that was read, so two
    /// racing advances cannot both succeed.
    pub async fn advance(&self, session_id: SessionId) -> Result<Advancement, SequencerError> {
        let session = self.load(session_id).await?;
        if !session.is_active() {
            return Err(SequencerError::GameNotActive);
        }
        let alive = self.alive_players(session_id).await?;
        let index = session.next_active_index(&alive)?;
        let active_player = session.turn_order[index];

        let swapped = self
            .sessions
            .compare_and_set_turn_index(session_id, session.current_turn_index, index)
            .await?;
        if !swapped {
            tracing::warn!(session_id = %session_id, "Turn pointer changed during advance");
            return Err(SequencerError::Conflict(session_id));
        }

        tracing::info!(
            session_id = %session_id,
            from = session.current_turn_index,
            to = index,
            active_player = %active_player,
            "Turn advanced"
        );
        self.notifier
            .publish(
                session_id,
                GameEvent::TurnChanged {
                    current_player_id: active_player,
                    turn_index: index,
                },
            )
            .await;

        Ok(Advancement {
            index,
            active_player,
        })
    }

    /// Structural sanity check for operational tooling.
    pub async fn validate(&self, session_id: SessionId) -> Result<SessionValidation, SequencerError> {
        let session = self.load(session_id).await?;
        let players = self.players.list_in_session(session_id).await?;
        Ok(session.validate(&players))
    }

    /// Delete the session's pending or resolving turn so the player can resubmit.
    pub async fn discard_in_flight_turn(
        &self,
        session_id: SessionId,
    ) -> Result<Option<TurnId>, SequencerError> {
        let Some(turn) = self.turns.find_in_flight(session_id).await? else {
            return Ok(None);
        };
        self.turns.delete(turn.id).await?;
        tracing::warn!(
            session_id = %session_id,
            turn_id = %turn.id,
            phase = ?turn.phase,
            "Discarded in-flight turn"
        );
        Ok(Some(turn.id))
    }

    /// Discard the in-flight turn only if it has been running longer than `max_age`.
    pub async fn reset_stale_turns(
        &self,
        session_id: SessionId,
        max_age: std::time::Duration,
    ) -> Result<Option<TurnId>, SequencerError> {
        let Some(turn) = self.turns.find_in_flight(session_id).await? else {
            return Ok(None);
        };
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        if !turn.is_stale(self.clock.now(), max_age) {
            return Ok(None);
        }
        self.discard_in_flight_turn(session_id).await
    }
}
