mod chat;
mod game;
mod player;
mod registry;
mod turn;
mod vote;
mod words;

pub use registry::{Session, SessionGuard, SessionHandle, SessionRegistry};

use crate::catalog::CategoryCatalog;
use crate::config::AppConfig;
use crate::error::{GameError, GameResult};
use crate::events::{EventBus, GameEvent, GameEventListener, GameNotification, ListenerId};
use crate::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Safe character set for game codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a random short code
pub(crate) fn generate_game_code<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Shared application state: every live game plus the services the games use
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub events: Arc<EventBus>,
    pub config: Arc<AppConfig>,
    catalog: Arc<dyn CategoryCatalog>,
    /// Seeds per-game random sources and draws game codes
    rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CategoryCatalog>, config: AppConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            registry: SessionRegistry::new(),
            events: Arc::new(EventBus::new(config.event_buffer)),
            config: Arc::new(config),
            catalog,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Deterministic state for tests and replays
    pub fn with_seed(catalog: Arc<dyn CategoryCatalog>, seed: u64) -> Self {
        Self::new(
            catalog,
            AppConfig {
                seed: Some(seed),
                ..AppConfig::default()
            },
        )
    }

    pub fn catalog(&self) -> &Arc<dyn CategoryCatalog> {
        &self.catalog
    }

    pub fn subscribe(&self, listener: Arc<dyn GameEventListener>) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Asynchronous stream of every event from every game
    pub fn notifications(&self) -> broadcast::Receiver<GameNotification> {
        self.events.receiver()
    }

    /// Snapshot of a game
    pub async fn get_game(&self, game_id: &str) -> GameResult<Game> {
        let handle = self.registry.get(game_id).await?;
        let session = handle.lock().await;
        Ok(session.game.clone())
    }

    pub async fn has_game(&self, game_id: &str) -> bool {
        self.registry.exists(game_id).await
    }

    /// Run `op` on a locked session, then publish the events it produced.
    ///
    /// `op` must validate before it mutates: an `Err` is returned as-is and no
    /// events are published. Listeners run before the lock is released, so they
    /// observe exactly the state `op` left behind.
    pub(crate) async fn with_session<T, F>(&self, game_id: &str, op: F) -> GameResult<T>
    where
        F: FnOnce(&mut Session, &mut Vec<GameEvent>) -> GameResult<T>,
    {
        let handle = self.registry.get(game_id).await?;
        let mut session = handle.lock().await;

        // The game may have been cancelled while we waited for the lock
        if !self.registry.exists(game_id).await {
            return Err(GameError::SessionNotFound(game_id.to_string()));
        }

        let mut events = Vec::new();
        let result = op(&mut *session, &mut events)?;
        self.events.dispatch(&session.game, events);
        Ok(result)
    }

    /// Register a fresh game under an unused code and return it locked.
    ///
    /// The master RNG draws the code and the seed for the game's own RNG.
    pub(crate) async fn register_game<F>(&self, build: F) -> SessionGuard
    where
        F: FnOnce(GameId) -> Game,
    {
        let mut rng = self.rng.lock().await;
        let seed: u64 = rng.random();
        let code_length = self.config.code_length;
        self.registry
            .create(
                || generate_game_code(&mut *rng, code_length),
                |game_id| Session::new(build(game_id), StdRng::seed_from_u64(seed)),
            )
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::catalog::StaticCatalog;

    pub fn catalog() -> Arc<dyn CategoryCatalog> {
        Arc::new(StaticCatalog::new(vec![
            Category::new("Animals", ["Cat", "Dog", "Fox"]),
            Category::new("Fruit", ["Apple", "Pear", "Plum", "Kiwi"]),
            Category::new("Solo", ["Only"]),
        ]))
    }

    pub fn state() -> AppState {
        AppState::with_seed(catalog(), 1234)
    }

    /// Recruiting game with the given players; returns them in join order
    pub async fn game_with_players(state: &AppState, names: &[&str], rounds: u32) -> Vec<Player> {
        let host = state
            .create_game(names[0], "Animals", rounds)
            .await
            .unwrap();
        let mut players = vec![host.clone()];
        for name in &names[1..] {
            players.push(state.join_game(&host.game_id, name).await.unwrap());
        }
        players
    }

    /// Started game with three players (Alice hosts)
    pub async fn started_game(state: &AppState, rounds: u32) -> Game {
        let players = game_with_players(state, &["Alice", "Bob", "Carol"], rounds).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();
        state.get_game(&game_id).await.unwrap()
    }
}
