//! Game event notification.
//!
//! Every state change produces one or more [`GameEvent`]s. They are delivered
//! synchronously to registered listeners (in subscription order) and then sent
//! on a broadcast channel for asynchronous consumers such as a transport layer.

use crate::types::{Game, GameId, PlayerId};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameEventKind {
    SessionCreated,
    PlayerJoined,
    MessageSent,
    SessionStarted,
    QuestionAsked,
    QuestionAnswered,
    TurnCompleted,
    NextRound,
    PlayComplete,
    Voted,
    SessionEnded,
    PlayerRemoved,
    SessionCancelled,
}

/// Description of one state change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEvent {
    pub kind: GameEventKind,
    /// The player the event is about (actor, or addressee for host-directed events)
    pub player_id: PlayerId,
    pub message: String,
}

impl GameEvent {
    pub fn new(kind: GameEventKind, player_id: impl Into<PlayerId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            player_id: player_id.into(),
            message: message.into(),
        }
    }
}

/// Event as published on the broadcast channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameNotification {
    pub game_id: GameId,
    #[serde(flatten)]
    pub event: GameEvent,
}

pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Synchronous observer of game events.
///
/// Called while the game is still locked, so the `game` it sees is the exact
/// state produced by the mutation. Listeners must not call back into
/// [`crate::state::AppState`] for the same game.
pub trait GameEventListener: Send + Sync {
    fn on_event(&self, game: &Game, event: &GameEvent) -> ListenerResult;
}

impl<F> GameEventListener for F
where
    F: Fn(&Game, &GameEvent) -> ListenerResult + Send + Sync,
{
    fn on_event(&self, game: &Game, event: &GameEvent) -> ListenerResult {
        self(game, event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered listener list plus broadcast fan-out
pub struct EventBus {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn GameEventListener>)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<GameNotification>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (sender, _rx) = broadcast::channel(buffer.max(1));
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn GameEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns false if the listener was not registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Receiver for the asynchronous notification stream
    pub fn receiver(&self) -> broadcast::Receiver<GameNotification> {
        self.sender.subscribe()
    }

    /// Deliver events in order: each event goes to every listener before the next event.
    pub fn dispatch(&self, game: &Game, events: Vec<GameEvent>) {
        if events.is_empty() {
            return;
        }

        // Snapshot so a listener (un)subscribing does not block on our read guard
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, l)| (*id, l.clone()))
            .collect();

        for event in events {
            tracing::debug!(
                "Game {} event {:?}: {}",
                game.id,
                event.kind,
                event.message
            );

            for (id, listener) in &listeners {
                match catch_unwind(AssertUnwindSafe(|| listener.on_event(game, &event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!("Listener {:?} failed on {:?}: {}", id, event.kind, e);
                    }
                    Err(_) => {
                        tracing::warn!("Listener {:?} panicked on {:?}", id, event.kind);
                    }
                }
            }

            // Ignore send errors (no receivers is fine)
            let _ = self.sender.send(GameNotification {
                game_id: game.id.clone(),
                event,
            });
        }
    }
}
