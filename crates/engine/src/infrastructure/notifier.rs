//! In-process broadcast of game events.
//!
//! Transport adapters (WebSocket, SSE) subscribe here and forward events to
//! clients of the matching session.

use async_trait::async_trait;
use powertale_domain::SessionId;
use tokio::sync::broadcast;

use crate::infrastructure::ports::{GameEvent, NotificationPort};

/// Default channel capacity; slow subscribers past this lag and drop events.
pub const DEFAULT_CAPACITY: usize = 256;

/// An event addressed to one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub event: GameEvent,
}

pub struct BroadcastNotifier {
    sender: broadcast::Sender<SessionEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl NotificationPort for BroadcastNotifier {
    async fn publish(&self, session_id: SessionId, event: GameEvent) {
        // No subscribers is not a failure; delivery belongs to the channel.
        if self.sender.send(SessionEvent { session_id, event }).is_err() {
            tracing::debug!(session_id = %session_id, "Game event dropped: no subscribers");
        }
    }
}
