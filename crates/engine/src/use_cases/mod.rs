//! Use cases - User story orchestration.
//!
//! Use cases orchestrate across entity modules to fulfill user stories.

pub mod lifecycle;
pub mod turn;

pub use lifecycle::{EndGame, LifecycleError, LifecycleUseCases, StartGame};
pub use turn::{
    NarrativeResponseValidator, NarrativeValidationError, TurnError, TurnOrchestrator,
    TurnOutcome, TurnResolution, TurnSettings, TurnUseCases, ValidationContext,
};
