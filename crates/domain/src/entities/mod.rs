//! Entities - things with identity that live inside a session.

mod character;
mod player;
mod stats_snapshot;
mod turn;

pub use character::Character;
pub use player::{Player, PlayerRole};
pub use stats_snapshot::StatsSnapshot;
pub use turn::{Turn, TurnPhase};
