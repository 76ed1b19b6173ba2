//! Game lifecycle: starting and ending a session.

use std::sync::Arc;

use powertale_domain::{DomainError, GameSession, SessionId, UserId};

use crate::entities::{can_end_game, can_start_game, PermissionDenied, PermissionGuard, SequencerError, TurnSequencer};
use crate::infrastructure::ports::{GameEvent, NotificationPort, PlayerRepo, RepoError, SessionRepo};
use crate::infrastructure::session_locks::SessionLocks;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Denied(#[from] PermissionDenied),
    #[error("A turn is in progress for session {0}")]
    TurnInProgress(SessionId),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Sequencer(#[from] SequencerError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct LifecycleUseCases {
    pub start: Arc<StartGame>,
    pub end: Arc<EndGame>,
}

impl LifecycleUseCases {
    pub fn new(start: Arc<StartGame>, end: Arc<EndGame>) -> Self {
        Self { start, end }
    }
}

async fn load(sessions: &dyn SessionRepo, session_id: SessionId) -> Result<GameSession, LifecycleError> {
    sessions
        .get(session_id)
        .await?
        .ok_or_else(|| DomainError::not_found("GameSession", session_id.to_string()).into())
}

/// Freeze the turn order from join order and hand the first turn out.
pub struct StartGame {
    guard: Arc<PermissionGuard>,
    sessions: Arc<dyn SessionRepo>,
    players: Arc<dyn PlayerRepo>,
    notifier: Arc<dyn NotificationPort>,
    locks: Arc<SessionLocks>,
}

impl StartGame {
    pub fn new(
        guard: Arc<PermissionGuard>,
        sessions: Arc<dyn SessionRepo>,
        players: Arc<dyn PlayerRepo>,
        notifier: Arc<dyn NotificationPort>,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            guard,
            sessions,
            players,
            notifier,
            locks,
        }
    }

    pub async fn execute(&self, session_id: SessionId, user_id: UserId) -> Result<GameSession, LifecycleError> {
        let _lock = self
            .locks
            .try_acquire(session_id)
            .ok_or(LifecycleError::TurnInProgress(session_id))?;

        self.guard
            .check(session_id, user_id, can_start_game)
            .await?
            .enforce()?;

        let mut session = load(self.sessions.as_ref(), session_id).await?;
        let turn_order = self
            .players
            .list_in_session(session_id)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        session.start(turn_order)?;
        self.sessions.save(&session).await?;

        let Some(first) = session.active_player() else {
            return Err(DomainError::invalid_state_transition("started session has no active player").into());
        };
        tracing::info!(
            session_id = %session_id,
            players = session.turn_order.len(),
            first_player = %first,
            "Game started"
        );

        self.notifier
            .publish(
                session_id,
                GameEvent::GameStarted {
                    turn_order: session.turn_order.clone(),
                    current_player_id: first,
                },
            )
            .await;
        self.notifier
            .publish(
                session_id,
                GameEvent::TurnChanged {
                    current_player_id: first,
                    turn_index: session.current_turn_index,
                },
            )
            .await;

        Ok(session)
    }
}

pub struct EndGame {
    guard: Arc<PermissionGuard>,
    sessions: Arc<dyn SessionRepo>,
    sequencer: Arc<TurnSequencer>,
    notifier: Arc<dyn NotificationPort>,
    locks: Arc<SessionLocks>,
}

impl EndGame {
    pub fn new(
        guard: Arc<PermissionGuard>,
        sessions: Arc<dyn SessionRepo>,
        sequencer: Arc<TurnSequencer>,
        notifier: Arc<dyn NotificationPort>,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            guard,
            sessions,
            sequencer,
            notifier,
            locks,
        }
    }

    pub async fn execute(&self, session_id: SessionId, user_id: UserId) -> Result<GameSession, LifecycleError> {
        let _lock = self
            .locks
            .try_acquire(session_id)
            .ok_or(LifecycleError::TurnInProgress(session_id))?;

        self.guard
            .check(session_id, user_id, can_end_game)
            .await?
            .enforce()?;

        let mut session = load(self.sessions.as_ref(), session_id).await?;
        session.end()?;
        self.sessions.save(&session).await?;
        self.sequencer.discard_in_flight_turn(session_id).await?;

        tracing::info!(session_id = %session_id, "Game ended");
        self.notifier.publish(session_id, GameEvent::GameEnded).await;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PermissionErrorCode;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::ports::{MockNotificationPort, TurnRepo};
    use crate::test_fixtures::{seed_active_session, seed_lobby};
    use chrono::Utc;
    use powertale_domain::{SessionStatus, Turn};

    struct Wiring {
        start: StartGame,
        end: EndGame,
        locks: Arc<SessionLocks>,
    }

    fn wire(store: &Arc<InMemoryStore>, notifier: MockNotificationPort) -> Wiring {
        let notifier: Arc<dyn NotificationPort> = Arc::new(notifier);
        let locks = Arc::new(SessionLocks::new());
        let guard = Arc::new(PermissionGuard::new(store.clone(), store.clone()));
        let sequencer = Arc::new(TurnSequencer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            Arc::new(FixedClock(Utc::now())),
        ));
        Wiring {
            start: StartGame::new(guard.clone(), store.clone(), store.clone(), notifier.clone(), locks.clone()),
            end: EndGame::new(guard, store.clone(), sequencer, notifier, locks.clone()),
            locks,
        }
    }

    #[tokio::test]
    async fn host_starts_game_in_join_order() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_lobby(&store, &[100, 100, 100]).await;
        let first = seeded.host();

        let mut notifier = MockNotificationPort::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_publish()
            .withf(|_, event| matches!(event, GameEvent::GameStarted { .. }))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ());
        notifier
            .expect_publish()
            .withf(move |_, event| {
                *event
                    == GameEvent::TurnChanged {
                        current_player_id: first,
                        turn_index: 0,
                    }
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ());

        let session = wire(&store, notifier)
            .start
            .execute(seeded.session_id, seeded.host())
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.turn_order, seeded.users);
        assert_eq!(session.current_turn_index, 0);
    }

    #[tokio::test]
    async fn member_cannot_start_game() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_lobby(&store, &[100, 100]).await;
        let mut notifier = MockNotificationPort::new();
        notifier.expect_publish().times(0);

        let err = wire(&store, notifier)
            .start
            .execute(seeded.session_id, seeded.users[1])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Denied(PermissionDenied {
                code: PermissionErrorCode::UnauthorizedNotHost,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn start_is_refused_while_session_is_locked() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_lobby(&store, &[100]).await;
        let wiring = wire(&store, MockNotificationPort::new());
        let _held = wiring.locks.try_acquire(seeded.session_id).unwrap();

        let err = wiring
            .start
            .execute(seeded.session_id, seeded.host())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::TurnInProgress(_)));
    }

    #[tokio::test]
    async fn ending_discards_in_flight_turn_and_announces() {
        let store = Arc::new(InMemoryStore::new());
        let seeded = seed_active_session(&store, &[100, 100]).await;
        let turn = Turn::begin(seeded.session_id, 1, seeded.host(), None, Utc::now());
        TurnRepo::save(store.as_ref(), &turn).await.unwrap();

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_publish()
            .withf(|_, event| *event == GameEvent::GameEnded)
            .times(1)
            .returning(|_, _| ());

        let wiring = wire(&store, notifier);
        let session = wiring.end.execute(seeded.session_id, seeded.host()).await.unwrap();
        assert_eq!(session.status, SessionStatus::Ended);
        assert!(store.find_in_flight(seeded.session_id).await.unwrap().is_none());

        let again = wiring.end.execute(seeded.session_id, seeded.host()).await.unwrap_err();
        assert!(matches!(
            again,
            LifecycleError::Denied(PermissionDenied {
                code: PermissionErrorCode::InvalidGameState,
                ..
            })
        ));
    }
}
