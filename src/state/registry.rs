use crate::error::{GameError, GameResult};
use crate::types::{Game, GameId};
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// A registered game plus the random source used for its draws
pub struct Session {
    pub game: Game,
    pub(crate) rng: StdRng,
}

impl Session {
    pub fn new(game: Game, rng: StdRng) -> Self {
        Self { game, rng }
    }
}

/// Handle to one session. Holding its lock serializes every mutation of that game.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Lock on a session that owns its handle
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Lookup of live games by id.
///
/// The map lock is only held for lookups and insert/remove; work on a game
/// happens under that session's own mutex so different games never contend.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<GameId, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session under the first id from `next_id` that is not taken.
    ///
    /// The session is handed back already locked, so no other operation can
    /// reach it before the caller has finished announcing it.
    pub async fn create<I, B>(&self, mut next_id: I, build: B) -> SessionGuard
    where
        I: FnMut() -> GameId,
        B: FnOnce(GameId) -> Session,
    {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let id = next_id();
            if !sessions.contains_key(&id) {
                break id;
            }
        };

        let handle = Arc::new(Mutex::new(build(id.clone())));
        let guard = handle.clone().lock_owned().await;
        sessions.insert(id, handle);
        guard
    }

    pub async fn get(&self, game_id: &str) -> GameResult<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or_else(|| GameError::SessionNotFound(game_id.to_string()))
    }

    pub async fn remove(&self, game_id: &str) -> Option<SessionHandle> {
        self.sessions.write().await.remove(game_id)
    }

    pub async fn exists(&self, game_id: &str) -> bool {
        self.sessions.read().await.contains_key(game_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<GameId> {
        self.sessions.read().await.keys().cloned().collect()
    }
}
