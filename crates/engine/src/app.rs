//! Application state and composition.

use std::sync::Arc;

use crate::entities::{PermissionGuard, StatResolutionEngine, TurnSequencer};
use crate::infrastructure::{
    clock::SystemClock,
    config::EngineConfig,
    llm_narrative::LlmNarrativeGenerator,
    memory::InMemoryStore,
    notifier::BroadcastNotifier,
    ollama::OllamaClient,
    ports::{
        CharacterRepo, ClockPort, LlmPort, NarrativePort, NotificationPort, PlayerRepo,
        SessionRepo, SnapshotRepo, TurnRepo,
    },
    session_locks::SessionLocks,
};
use crate::use_cases;

/// The record store as seen through its ports.
#[derive(Clone)]
pub struct StorePorts {
    pub sessions: Arc<dyn SessionRepo>,
    pub players: Arc<dyn PlayerRepo>,
    pub characters: Arc<dyn CharacterRepo>,
    pub turns: Arc<dyn TurnRepo>,
    pub snapshots: Arc<dyn SnapshotRepo>,
}

impl StorePorts {
    /// Use one backend for every repository port.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: SessionRepo + PlayerRepo + CharacterRepo + TurnRepo + SnapshotRepo + 'static,
    {
        Self {
            sessions: store.clone(),
            players: store.clone(),
            characters: store.clone(),
            turns: store.clone(),
            snapshots: store,
        }
    }
}

/// Main application state.
///
/// Holds the store ports, the entity modules, and the use cases.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub locks: Arc<SessionLocks>,
}

/// Store ports plus the entity modules built on them.
pub struct Repositories {
    pub store: StorePorts,
    pub guard: Arc<PermissionGuard>,
    pub sequencer: Arc<TurnSequencer>,
    pub stats: Arc<StatResolutionEngine>,
}

/// Container for all use cases.
pub struct UseCases {
    pub turn: use_cases::TurnUseCases,
    pub lifecycle: use_cases::LifecycleUseCases,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        store: StorePorts,
        narrative: Arc<dyn NarrativePort>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn ClockPort>,
        config: &EngineConfig,
    ) -> Self {
        let locks = Arc::new(SessionLocks::new());

        let guard = Arc::new(PermissionGuard::new(
            store.sessions.clone(),
            store.players.clone(),
        ));
        let sequencer = Arc::new(TurnSequencer::new(
            store.sessions.clone(),
            store.players.clone(),
            store.characters.clone(),
            store.turns.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let stats = Arc::new(StatResolutionEngine::new(
            store.characters.clone(),
            store.snapshots.clone(),
            store.turns.clone(),
            clock.clone(),
            config.level_up_frequency,
        ));

        let submit = Arc::new(use_cases::TurnOrchestrator::new(
            guard.clone(),
            sequencer.clone(),
            stats.clone(),
            store.characters.clone(),
            store.turns.clone(),
            narrative,
            notifier.clone(),
            clock,
            locks.clone(),
            use_cases::TurnSettings::from(config),
        ));
        let start = Arc::new(use_cases::StartGame::new(
            guard.clone(),
            store.sessions.clone(),
            store.players.clone(),
            notifier.clone(),
            locks.clone(),
        ));
        let end = Arc::new(use_cases::EndGame::new(
            guard.clone(),
            store.sessions.clone(),
            sequencer.clone(),
            notifier,
            locks.clone(),
        ));

        Self {
            repositories: Repositories {
                store,
                guard,
                sequencer,
                stats,
            },
            use_cases: UseCases {
                turn: use_cases::TurnUseCases::new(submit),
                lifecycle: use_cases::LifecycleUseCases::new(start, end),
            },
            locks,
        }
    }

    /// Single-process wiring: in-memory store, broadcast events, Ollama narrator.
    ///
    /// Returns the notifier so transports can subscribe to it.
    pub fn in_memory(config: &EngineConfig) -> (Self, Arc<BroadcastNotifier>) {
        let llm: Arc<dyn LlmPort> = Arc::new(OllamaClient::from_config(config));
        let narrative: Arc<dyn NarrativePort> = Arc::new(LlmNarrativeGenerator::new(llm));
        let notifier = Arc::new(BroadcastNotifier::default());
        tracing::info!(
            model = %config.ollama_model,
            base_url = %config.ollama_base_url,
            "Wiring in-memory engine"
        );

        let app = Self::new(
            StorePorts::shared(Arc::new(InMemoryStore::new())),
            narrative,
            notifier.clone(),
            Arc::new(SystemClock::new()),
            config,
        );
        (app, notifier)
    }
}
