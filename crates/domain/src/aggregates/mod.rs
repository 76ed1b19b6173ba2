//! Aggregates - consistency boundaries mutated under a single lock.

mod game_session;

pub use game_session::{GameSession, SessionStatus, SessionValidation, DEFAULT_MAX_PLAYERS};
