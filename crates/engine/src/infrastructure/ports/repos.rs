// Port traits define the full contract - some methods serve operational tooling
#![allow(dead_code)]

//! Repository port traits for the persistent store.
//!
//! The store is a transactional record store. The engine only relies on
//! atomicity of single-record writes plus compare-and-swap on the session's
//! turn pointer.

use async_trait::async_trait;
use powertale_domain::*;

use super::error::RepoError;

// =============================================================================
// Sessions
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn get(&self, id: SessionId) -> Result<Option<GameSession>, RepoError>;
    async fn save(&self, session: &GameSession) -> Result<(), RepoError>;

    /// Atomically move the turn pointer from `expected` to `next`.
    ///
    /// Returns `false` (and writes nothing) when the stored index is no longer
    /// `expected`.
    async fn compare_and_set_turn_index(
        &self,
        id: SessionId,
        expected: usize,
        next: usize,
    ) -> Result<bool, RepoError>;
}

// =============================================================================
// Players
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerRepo: Send + Sync {
    /// Players of a session in join order.
    async fn list_in_session(&self, session_id: SessionId) -> Result<Vec<Player>, RepoError>;
    async fn save(&self, player: &Player) -> Result<(), RepoError>;
    async fn delete(&self, session_id: SessionId, user_id: UserId) -> Result<(), RepoError>;
}

// =============================================================================
// Characters
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterRepo: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
    async fn save(&self, character: &Character) -> Result<(), RepoError>;
    async fn list_in_session(&self, session_id: SessionId) -> Result<Vec<Character>, RepoError>;
}

// =============================================================================
// Turns
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TurnRepo: Send + Sync {
    async fn get(&self, id: TurnId) -> Result<Option<Turn>, RepoError>;
    async fn save(&self, turn: &Turn) -> Result<(), RepoError>;
    async fn delete(&self, id: TurnId) -> Result<(), RepoError>;

    /// The pending or resolving turn of a session, if any.
    async fn find_in_flight(&self, session_id: SessionId) -> Result<Option<Turn>, RepoError>;

    /// Highest turn index used in the session, 0 when no turn exists yet.
    async fn latest_turn_index(&self, session_id: SessionId) -> Result<u64, RepoError>;

    /// Most recent completed turns, newest last.
    async fn list_recent_completed(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<Turn>, RepoError>;

    async fn count_completed_for_player(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<u64, RepoError>;
}

// =============================================================================
// Progression history
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotRepo: Send + Sync {
    async fn save(&self, snapshot: &StatsSnapshot) -> Result<(), RepoError>;

    /// Snapshots of a character in creation order.
    async fn list_for_character(
        &self,
        character_id: CharacterId,
    ) -> Result<Vec<StatsSnapshot>, RepoError>;
}
