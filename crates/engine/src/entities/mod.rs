//! Entity modules - turn-resolution capabilities over the repository ports.
//!
//! They depend on repository ports and provide the building blocks for use cases.

pub mod permission_guard;
pub mod stat_resolution;
pub mod turn_sequencer;

pub use permission_guard::{
    can_create_character, can_end_game, can_join_game, can_leave_game, can_modify_settings,
    can_start_game, can_submit_action, can_view_game, check_all, is_active_player, is_host,
    GameView, PermissionCheck, PermissionDenied, PermissionErrorCode, PermissionGuard,
};
pub use stat_resolution::{expected_level, StatResolutionEngine, StatResolutionError};
pub use turn_sequencer::{alive_players, Advancement, SequencerError, TurnSequencer};
