//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The record store (sessions, players, characters, turns, snapshots)
//! - The narrative collaborator (and the LLM behind it)
//! - The real-time notification channel
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;
pub mod types;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{CharacterRepo, PlayerRepo, SessionRepo, SnapshotRepo, TurnRepo};

// =============================================================================
// Types crossing the ports
// =============================================================================
pub use types::{CharacterBrief, EventLogEntry, GameEvent, NarrativeContext, PerkContext};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    ChatMessage, LlmPort, LlmRequest, LlmResponse, MessageRole, NarrativePort, NotificationPort,
    TokenUsage,
};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{
    MockCharacterRepo, MockPlayerRepo, MockSessionRepo, MockSnapshotRepo, MockTurnRepo,
};

#[cfg(test)]
pub use external::{MockLlmPort, MockNarrativePort, MockNotificationPort};

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{LlmError, NarrativeError, RepoError};
