//! In-process record store implementing every repository port.
//!
//! Each map entry is guarded by its `DashMap` shard lock, which gives
//! single-record atomicity and makes the turn-pointer CAS race-free.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use powertale_domain::{
    Character, CharacterId, GameSession, Player, SessionId, StatsSnapshot, Turn, TurnId,
    TurnPhase, UserId,
};

use crate::infrastructure::ports::{
    CharacterRepo, PlayerRepo, RepoError, SessionRepo, SnapshotRepo, TurnRepo,
};

#[derive(Default)]
pub struct InMemoryStore {
    sessions: DashMap<SessionId, GameSession>,
    /// Value carries an insertion sequence so join order survives equal timestamps
    players: DashMap<(SessionId, UserId), (u64, Player)>,
    player_seq: AtomicU64,
    characters: DashMap<CharacterId, Character>,
    turns: DashMap<TurnId, Turn>,
    snapshots: DashMap<CharacterId, Vec<StatsSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepo for InMemoryStore {
    async fn get(&self, id: SessionId) -> Result<Option<GameSession>, RepoError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn save(&self, session: &GameSession) -> Result<(), RepoError> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn compare_and_set_turn_index(
        &self,
        id: SessionId,
        expected: usize,
        next: usize,
    ) -> Result<bool, RepoError> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| RepoError::not_found("Session", id))?;
        if session.current_turn_index != expected {
            return Ok(false);
        }
        session.current_turn_index = next;
        Ok(true)
    }
}

#[async_trait]
impl PlayerRepo for InMemoryStore {
    async fn list_in_session(&self, session_id: SessionId) -> Result<Vec<Player>, RepoError> {
        let mut seated: Vec<(u64, Player)> = self
            .players
            .iter()
            .filter(|entry| entry.key().0 == session_id)
            .map(|entry| entry.value().clone())
            .collect();
        seated.sort_by_key(|(seq, _)| *seq);
        Ok(seated.into_iter().map(|(_, player)| player).collect())
    }

    async fn save(&self, player: &Player) -> Result<(), RepoError> {
        let key = (player.session_id, player.user_id);
        self.players
            .entry(key)
            .and_modify(|existing| existing.1 = player.clone())
            .or_insert_with(|| (self.player_seq.fetch_add(1, Ordering::SeqCst), player.clone()));
        Ok(())
    }

    async fn delete(&self, session_id: SessionId, user_id: UserId) -> Result<(), RepoError> {
        self.players.remove(&(session_id, user_id));
        Ok(())
    }
}

#[async_trait]
impl CharacterRepo for InMemoryStore {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        Ok(self.characters.get(&id).map(|c| c.clone()))
    }

    async fn save(&self, character: &Character) -> Result<(), RepoError> {
        self.characters.insert(character.id, character.clone());
        Ok(())
    }

    async fn list_in_session(&self, session_id: SessionId) -> Result<Vec<Character>, RepoError> {
        Ok(self
            .characters
            .iter()
            .filter(|c| c.session_id == session_id)
            .map(|c| c.clone())
            .collect())
    }
}

#[async_trait]
impl TurnRepo for InMemoryStore {
    async fn get(&self, id: TurnId) -> Result<Option<Turn>, RepoError> {
        Ok(self.turns.get(&id).map(|t| t.clone()))
    }

    async fn save(&self, turn: &Turn) -> Result<(), RepoError> {
        self.turns.insert(turn.id, turn.clone());
        Ok(())
    }

    async fn delete(&self, id: TurnId) -> Result<(), RepoError> {
        self.turns.remove(&id);
        Ok(())
    }

    async fn find_in_flight(&self, session_id: SessionId) -> Result<Option<Turn>, RepoError> {
        Ok(self
            .turns
            .iter()
            .find(|t| t.session_id == session_id && t.is_in_flight())
            .map(|t| t.clone()))
    }

    async fn latest_turn_index(&self, session_id: SessionId) -> Result<u64, RepoError> {
        Ok(self
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .map(|t| t.turn_index)
            .max()
            .unwrap_or(0))
    }

    async fn list_recent_completed(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<Turn>, RepoError> {
        let mut completed: Vec<Turn> = self
            .turns
            .iter()
            .filter(|t| t.session_id == session_id && t.phase == TurnPhase::Completed)
            .map(|t| t.clone())
            .collect();
        completed.sort_by_key(|t| t.turn_index);
        let skip = completed.len().saturating_sub(limit);
        Ok(completed.into_iter().skip(skip).collect())
    }

    async fn count_completed_for_player(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<u64, RepoError> {
        Ok(self
            .turns
            .iter()
            .filter(|t| {
                t.session_id == session_id
                    && t.active_player_id == user_id
                    && t.phase == TurnPhase::Completed
            })
            .count() as u64)
    }
}

#[async_trait]
impl SnapshotRepo for InMemoryStore {
    async fn save(&self, snapshot: &StatsSnapshot) -> Result<(), RepoError> {
        self.snapshots
            .entry(snapshot.character_id)
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn list_for_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<StatsSnapshot>, RepoError> {
        Ok(self
            .snapshots
            .get(&character_id)
            .map(|s| s.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use powertale_domain::PlayerRole;

    #[tokio::test]
    async fn cas_only_moves_from_expected_index() {
        let store = InMemoryStore::new();
        let (a, b) = (UserId::new(), UserId::new());
        let mut session = GameSession::new(a, Utc::now());
        session.start(vec![a, b]).unwrap();
        SessionRepo::save(&store, &session).await.unwrap();

        assert!(store.compare_and_set_turn_index(session.id, 0, 1).await.unwrap());
        assert!(!store.compare_and_set_turn_index(session.id, 0, 1).await.unwrap());
        let stored = SessionRepo::get(&store, session.id).await.unwrap().unwrap();
        assert_eq!(stored.current_turn_index, 1);
    }

    #[tokio::test]
    async fn players_keep_join_order_across_updates() {
        let store = InMemoryStore::new();
        let session_id = SessionId::new();
        let now = Utc::now();
        let users: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
        for user in &users {
            PlayerRepo::save(&store, &Player::new(session_id, *user, PlayerRole::Member, now))
                .await
                .unwrap();
        }
        let updated = Player::new(session_id, users[0], PlayerRole::Host, now)
            .with_character(CharacterId::new());
        PlayerRepo::save(&store, &updated).await.unwrap();

        let listed = PlayerRepo::list_in_session(&store, session_id).await.unwrap();
        let order: Vec<UserId> = listed.iter().map(|p| p.user_id).collect();
        assert_eq!(order, users);
        assert!(listed[0].has_character());
    }

    #[tokio::test]
    async fn recent_completed_returns_newest_last() {
        let store = InMemoryStore::new();
        let session_id = SessionId::new();
        let user = UserId::new();
        for index in 1..=4 {
            let mut turn = Turn::begin(session_id, index, user, None, Utc::now());
            turn.mark_resolving().unwrap();
            turn.complete(format!("chapter {index}"), Utc::now()).unwrap();
            TurnRepo::save(&store, &turn).await.unwrap();
        }
        let pending = Turn::begin(session_id, 5, user, None, Utc::now());
        TurnRepo::save(&store, &pending).await.unwrap();

        let recent = store.list_recent_completed(session_id, 2).await.unwrap();
        let indexes: Vec<u64> = recent.iter().map(|t| t.turn_index).collect();
        assert_eq!(indexes, vec![3, 4]);
        assert_eq!(store.latest_turn_index(session_id).await.unwrap(), 5);
        assert_eq!(store.count_completed_for_player(session_id, user).await.unwrap(), 4);
        assert_eq!(
            store.find_in_flight(session_id).await.unwrap().map(|t| t.id),
            Some(pending.id)
        );
    }
}
