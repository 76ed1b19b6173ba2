//! Permission Guard - who may do what to a session right now.
//!
//! The checks are pure functions over a loaded [`GameView`]. Expected denials
//! come back as a [`PermissionCheck`] value; only [`PermissionCheck::enforce`]
//! turns a denial into an error.

use std::sync::Arc;

use serde::Serialize;

use powertale_domain::{GameSession, Player, SessionId, UserId};

use crate::infrastructure::ports::{PlayerRepo, RepoError, SessionRepo};

/// Stable denial codes callers can map to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionErrorCode {
    UnauthorizedNotHost,
    UnauthorizedNotActivePlayer,
    GameNotFound,
    PlayerNotInGame,
    InvalidGameState,
}

impl PermissionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnauthorizedNotHost => "UNAUTHORIZED_NOT_HOST",
            Self::UnauthorizedNotActivePlayer => "UNAUTHORIZED_NOT_ACTIVE_PLAYER",
            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::PlayerNotInGame => "PLAYER_NOT_IN_GAME",
            Self::InvalidGameState => "INVALID_GAME_STATE",
        }
    }
}

impl std::fmt::Display for PermissionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {reason}")]
pub struct PermissionDenied {
    pub code: PermissionErrorCode,
    pub reason: String,
}

impl PermissionDenied {
    fn new(code: PermissionErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<PermissionErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PermissionCheck {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            error_code: None,
            reason: None,
        }
    }

    pub fn deny(code: PermissionErrorCode, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            error_code: Some(code),
            reason: Some(reason.into()),
        }
    }

    /// Fail-fast form for call sites that treat a denial as an error.
    pub fn enforce(self) -> Result<(), PermissionDenied> {
        if self.allowed {
            return Ok(());
        }
        Err(PermissionDenied {
            code: self
                .error_code
                .unwrap_or(PermissionErrorCode::InvalidGameState),
            reason: self.reason.unwrap_or_else(|| "permission denied".to_string()),
        })
    }
}

impl From<PermissionDenied> for PermissionCheck {
    fn from(denied: PermissionDenied) -> Self {
        Self::deny(denied.code, denied.reason)
    }
}

/// First denial, or allow when every check passes.
pub fn check_all<I>(checks: I) -> PermissionCheck
where
    I: IntoIterator<Item = PermissionCheck>,
{
    checks
        .into_iter()
        .find(|check| !check.allowed)
        .unwrap_or_else(PermissionCheck::allow)
}

/// A session together with its seated players.
#[derive(Debug, Clone, PartialEq)]
pub struct GameView {
    pub session: GameSession,
    pub players: Vec<Player>,
}

impl GameView {
    pub fn member(&self, user_id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    fn require_member(&self, user_id: UserId) -> PermissionCheck {
        match self.member(user_id) {
            Some(_) => PermissionCheck::allow(),
            None => PermissionCheck::deny(
                PermissionErrorCode::PlayerNotInGame,
                "You are not a player in this game",
            ),
        }
    }

    fn require_lobby(&self) -> PermissionCheck {
        if self.session.is_lobby() {
            PermissionCheck::allow()
        } else {
            PermissionCheck::deny(
                PermissionErrorCode::InvalidGameState,
                format!("Game is {}, not in the lobby", self.session.status),
            )
        }
    }

    fn require_host(&self, user_id: UserId) -> PermissionCheck {
        if self.session.is_host(user_id) {
            PermissionCheck::allow()
        } else {
            PermissionCheck::deny(
                PermissionErrorCode::UnauthorizedNotHost,
                "Only the host can do that",
            )
        }
    }
}

fn game_not_found() -> PermissionDenied {
    PermissionDenied::new(PermissionErrorCode::GameNotFound, "Game not found")
}

macro_rules! found_or_deny {
    ($view:expr) => {
        match $view {
            Some(view) => view,
            None => return game_not_found().into(),
        }
    };
}

pub fn is_host(view: Option<&GameView>, user_id: UserId) -> Result<bool, PermissionDenied> {
    let view = view.ok_or_else(game_not_found)?;
    Ok(view.session.is_host(user_id))
}

pub fn is_active_player(view: Option<&GameView>, user_id: UserId) -> Result<bool, PermissionDenied> {
    let view = view.ok_or_else(game_not_found)?;
    if !view.session.is_active() {
        return Err(PermissionDenied::new(
            PermissionErrorCode::InvalidGameState,
            format!("Game is {}, not active", view.session.status),
        ));
    }
    Ok(view.session.active_player() == Some(user_id))
}

pub fn can_submit_action(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    let membership = game.require_member(user_id);
    if !membership.allowed {
        return membership;
    }
    match is_active_player(view, user_id) {
        Ok(true) => PermissionCheck::allow(),
        Ok(false) => PermissionCheck::deny(
            PermissionErrorCode::UnauthorizedNotActivePlayer,
            "It is not your turn",
        ),
        Err(denied) => denied.into(),
    }
}

pub fn can_start_game(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    let roster = if game.players.is_empty() {
        PermissionCheck::deny(PermissionErrorCode::InvalidGameState, "Game has no players")
    } else if let Some(missing) = game.players.iter().find(|p| !p.has_character()) {
        PermissionCheck::deny(
            PermissionErrorCode::InvalidGameState,
            format!("Player {} has not created a character", missing.user_id),
        )
    } else {
        PermissionCheck::allow()
    };
    check_all([game.require_host(user_id), game.require_lobby(), roster])
}

pub fn can_end_game(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    let not_ended = if game.session.status == powertale_domain::SessionStatus::Ended {
        PermissionCheck::deny(PermissionErrorCode::InvalidGameState, "Game has already ended")
    } else {
        PermissionCheck::allow()
    };
    check_all([game.require_host(user_id), not_ended])
}

pub fn can_modify_settings(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    check_all([game.require_host(user_id), game.require_lobby()])
}

/// Joining twice is allowed so reconnecting clients can repeat the call.
pub fn can_join_game(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    if game.member(user_id).is_some() {
        return PermissionCheck::allow();
    }
    let capacity = if game.players.len() >= game.session.max_players {
        PermissionCheck::deny(PermissionErrorCode::InvalidGameState, "Game is full")
    } else {
        PermissionCheck::allow()
    };
    check_all([game.require_lobby(), capacity])
}

pub fn can_leave_game(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    check_all([game.require_member(user_id), game.require_lobby()])
}

pub fn can_create_character(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    let game = found_or_deny!(view);
    check_all([game.require_member(user_id), game.require_lobby()])
}

pub fn can_view_game(view: Option<&GameView>, user_id: UserId) -> PermissionCheck {
    found_or_deny!(view).require_member(user_id)
}

/// Loads session state for the pure checks above.
pub struct PermissionGuard {
    sessions: Arc<dyn SessionRepo>,
    players: Arc<dyn PlayerRepo>,
}

impl PermissionGuard {
    pub fn new(sessions: Arc<dyn SessionRepo>, players: Arc<dyn PlayerRepo>) -> Self {
        Self { sessions, players }
    }

    pub async fn load(&self, session_id: SessionId) -> Result<Option<GameView>, RepoError> {
        let Some(session) = self.sessions.get(session_id).await? else {
            return Ok(None);
        };
        let players = self.players.list_in_session(session_id).await?;
        Ok(Some(GameView { session, players }))
    }

    /// Load the session and run one check against it.
    pub async fn check<F>(
        &self,
        session_id: SessionId,
        user_id: UserId,
        rule: F,
    ) -> Result<PermissionCheck, RepoError>
    where
        F: FnOnce(Option<&GameView>, UserId) -> PermissionCheck + Send,
    {
        let view = self.load(session_id).await?;
        let check = rule(view.as_ref(), user_id);
        if !check.allowed {
            tracing::debug!(
                session_id = %session_id,
                user_id = %user_id,
                code = ?check.error_code,
                "Permission denied"
            );
        }
        Ok(check)
    }
}
