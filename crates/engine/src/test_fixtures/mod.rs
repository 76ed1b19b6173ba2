//! Test fixtures: JSON payload loading, seeded sessions, and a scripted narrator.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_fixtures::{seed_active_session, ScriptedNarrator};
//!
//! let store = Arc::new(InMemoryStore::new());
//! let seeded = seed_active_session(&store, &[100, 0, 100]).await;
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Notify};

use powertale_domain::{
    Ability, Attributes, Character, CharacterId, GameSession, Player, PlayerRole, PowerSheet,
    SessionId, UserId,
};

use crate::infrastructure::memory::InMemoryStore;
use crate::infrastructure::notifier::SessionEvent;
use crate::infrastructure::ports::{
    CharacterRepo, GameEvent, NarrativeContext, NarrativeError, NarrativePort, PerkContext,
    PlayerRepo, SessionRepo,
};

// =============================================================================
// Fixture Loading
// =============================================================================

/// Load a JSON fixture from the `test_data/` directory.
///
/// # Panics
///
/// Panics if the fixture file cannot be read or parsed.
pub fn load_fixture<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(path);
    let content = std::fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!("Failed to read fixture '{}': {}", fixture_path.display(), e)
    });
    serde_json::from_str(&content).unwrap_or_else(|e| {
        panic!("Failed to parse fixture '{}': {}", fixture_path.display(), e)
    })
}

// =============================================================================
// Collaborator Payloads
// =============================================================================

pub mod payloads {
    use super::*;

    pub fn choices() -> Value {
        json!([
            {"label": "A", "description": "Press the attack", "riskLevel": "high"},
            {"label": "B", "description": "Regroup", "riskLevel": "low"},
            {"label": "C", "description": "Bargain", "riskLevel": "medium"},
            {"label": "D", "description": "Unleash everything", "riskLevel": "extreme"},
        ])
    }

    pub fn resolved(narrative: &str, stat_updates: Value) -> Value {
        json!({
            "valid": true,
            "narrative": narrative,
            "choices": choices(),
            "statUpdates": stat_updates,
        })
    }

    pub fn rejected(reason: &str) -> Value {
        json!({"valid": false, "validationError": reason})
    }

    pub fn perk(name: &str, description: &str) -> Value {
        json!({"name": name, "description": description})
    }
}

// =============================================================================
// Seeded Sessions
// =============================================================================

pub const HERO_NAMES: [&str; 6] = [
    "Blazekin",
    "Tidecaller",
    "Stonewarden",
    "Voltra",
    "Nightglass",
    "Emberwing",
];

#[derive(Debug, Clone)]
pub struct SeededSession {
    pub session_id: SessionId,
    pub users: Vec<UserId>,
    pub characters: Vec<CharacterId>,
}

impl SeededSession {
    pub fn host(&self) -> UserId {
        self.users[0]
    }
}

pub fn hero_sheet(hp: u32) -> PowerSheet {
    let abilities = vec![Ability::new("Signature Move", "What they are known for", 6, Some(2))];
    let mut sheet = PowerSheet::new(100.max(hp), Attributes::default(), abilities, "Overconfidence")
        .expect("valid power sheet");
    sheet.hp = hp;
    sheet
}

/// Seat one player per entry of `hps`, each with a character at that hp.
///
/// The first user hosts. Players join in order.
pub async fn seed_lobby(store: &Arc<InMemoryStore>, hps: &[u32]) -> SeededSession {
    let now = Utc::now();
    let users: Vec<UserId> = hps.iter().map(|_| UserId::new()).collect();
    let session = GameSession::new(users[0], now);

    let mut characters = Vec::with_capacity(hps.len());
    for (seat, (user, hp)) in users.iter().zip(hps).enumerate() {
        let name = HERO_NAMES[seat % HERO_NAMES.len()];
        let character = Character::new(session.id, *user, name, hero_sheet(*hp));
        CharacterRepo::save(store.as_ref(), &character).await.unwrap();

        let role = if seat == 0 { PlayerRole::Host } else { PlayerRole::Member };
        let player = Player::new(session.id, *user, role, now).with_character(character.id);
        PlayerRepo::save(store.as_ref(), &player).await.unwrap();
        characters.push(character.id);
    }
    SessionRepo::save(store.as_ref(), &session).await.unwrap();

    SeededSession {
        session_id: session.id,
        users,
        characters,
    }
}

/// Like [`seed_lobby`], then started with join order as turn order.
pub async fn seed_active_session(store: &Arc<InMemoryStore>, hps: &[u32]) -> SeededSession {
    let seeded = seed_lobby(store, hps).await;
    let mut session = SessionRepo::get(store.as_ref(), seeded.session_id)
        .await
        .unwrap()
        .unwrap();
    session.start(seeded.users.clone()).unwrap();
    SessionRepo::save(store.as_ref(), &session).await.unwrap();
    seeded
}

// =============================================================================
// Scripted Narrator
// =============================================================================

type Scripted = Result<Value, NarrativeError>;

/// Narrative collaborator that replays queued replies.
///
/// An empty queue answers with `InvalidResponse`. With a gate installed, each
/// turn request signals `entered` and then waits for `release`.
#[derive(Default)]
pub struct ScriptedNarrator {
    turns: Mutex<VecDeque<Scripted>>,
    perks: Mutex<VecDeque<Scripted>>,
    contexts: Mutex<Vec<NarrativeContext>>,
    perk_requests: Mutex<Vec<PerkContext>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(self, reply: Scripted) -> Self {
        self.turns.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_perk(self, reply: Scripted) -> Self {
        self.perks.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_gate(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    pub fn turn_requests(&self) -> Vec<NarrativeContext> {
        self.contexts.lock().unwrap().clone()
    }

    pub fn perk_requests(&self) -> Vec<PerkContext> {
        self.perk_requests.lock().unwrap().clone()
    }

    fn next(queue: &Mutex<VecDeque<Scripted>>) -> Scripted {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(NarrativeError::InvalidResponse("script exhausted".into())))
    }
}

#[async_trait]
impl NarrativePort for ScriptedNarrator {
    async fn generate_turn(&self, context: &NarrativeContext) -> Result<Value, NarrativeError> {
        self.contexts.lock().unwrap().push(context.clone());
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        Self::next(&self.turns)
    }

    async fn generate_perk(&self, context: &PerkContext) -> Result<Value, NarrativeError> {
        self.perk_requests.lock().unwrap().push(context.clone());
        Self::next(&self.perks)
    }
}

// =============================================================================
// Event Helpers
// =============================================================================

/// Everything currently buffered on a broadcast subscription.
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    while let Ok(received) = rx.try_recv() {
        events.push(received.event);
    }
    events
}
