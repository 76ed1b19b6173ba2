//! Unified error types for the domain layer
//!
//! Domain operations are pure; these errors describe broken invariants and
//! rejected state transitions, never I/O failures.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    ///
    /// # Example
    /// ```ignore
    /// if weakness.trim().is_empty() {
    ///     return Err(DomainError::validation("weakness cannot be empty"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create an invalid state transition error
    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }
}

/// Failures of turn-order computation on a session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TurnOrderError {
    #[error("Game is not active")]
    GameNotActive,
    #[error("Turn order is empty")]
    EmptyTurnOrder,
    #[error("No alive players remain in the turn order")]
    NoAlivePlayers,
}
