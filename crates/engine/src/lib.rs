//! Powertale Engine library.
//!
//! Turn resolution for a turn-based multiplayer narrative game.
//!
//! ## Structure
//!
//! - `entities/` - Turn sequencing, permissions, and stat resolution over the ports
//! - `use_cases/` - Turn orchestration and game lifecycle
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

/// Test fixtures shared by unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
