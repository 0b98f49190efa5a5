use super::words::assign_roles;
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::events::{GameEvent, GameEventKind};
use crate::types::*;
use rand::Rng;

/// Trimmed display name, rejecting blanks
pub(crate) fn validate_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::precondition("Player name cannot be empty"));
    }
    Ok(name.to_string())
}

impl AppState {
    /// Create a game hosted by a new player. Returns the host.
    pub async fn create_game(
        &self,
        host_name: &str,
        category_name: &str,
        rounds: u32,
    ) -> GameResult<Player> {
        let name = validate_name(host_name)?;
        self.open_game(category_name, rounds, Player::new(name, GameId::new()))
            .await
    }

    /// Create a game hosted by a player known from an earlier game, keeping their identity
    pub async fn create_game_with_player(
        &self,
        host: &Player,
        category_name: &str,
        rounds: u32,
    ) -> GameResult<Player> {
        validate_name(&host.name)?;
        self.open_game(category_name, rounds, host.bind_to(""))
            .await
    }

    /// Register a game hosted by `host`, which gets bound to the new code
    async fn open_game(
        &self,
        category_name: &str,
        rounds: u32,
        mut host: Player,
    ) -> GameResult<Player> {
        if rounds == 0 {
            return Err(GameError::precondition("A game needs at least one round"));
        }
        let category = self.catalog().get_category(category_name).await?;
        let max_players = self.config.max_players;

        let session = self
            .register_game(|game_id| {
                host.game_id = game_id.clone();
                let mut game = Game::new(game_id, category, rounds, max_players);
                game.players.push(host.clone());
                game
            })
            .await;

        let game = &session.game;
        tracing::info!(
            "Game {} created by {} (category: {}, rounds: {})",
            game.id,
            host.name,
            category_name,
            rounds
        );

        self.events.dispatch(
            game,
            vec![GameEvent::new(
                GameEventKind::SessionCreated,
                host.id.clone(),
                format!("{} created the game", host.name),
            )],
        );
        Ok(host)
    }

    /// Join a game under a new display name
    pub async fn join_game(&self, game_id: &str, name: &str) -> GameResult<Player> {
        let name = validate_name(name)?;
        self.with_session(game_id, |session, events| {
            let game = &mut session.game;
            if game.has_player_named(&name) {
                return Err(GameError::DuplicateName(name));
            }
            ensure_joinable(game)?;

            let player = Player::new(name, game.id.clone());
            game.players.push(player.clone());
            tracing::info!("{} joined game {}", player.name, game.id);
            events.push(GameEvent::new(
                GameEventKind::PlayerJoined,
                player.id.clone(),
                format!("{} joined the game", player.name),
            ));
            Ok(player)
        })
        .await
    }

    /// Join with an existing identity. Rejoining a game the player is already in is a no-op.
    pub async fn rejoin_game(&self, game_id: &str, player: &Player) -> GameResult<Player> {
        validate_name(&player.name)?;
        self.with_session(game_id, |session, events| {
            let game = &mut session.game;
            if let Some(existing) = game.player(&player.id) {
                return Ok(existing.clone());
            }
            if game.has_player_named(&player.name) {
                return Err(GameError::DuplicateName(player.name.clone()));
            }
            ensure_joinable(game)?;

            let bound = player.bind_to(&game.id);
            game.players.push(bound.clone());
            tracing::info!("{} rejoined as {} in game {}", bound.id, bound.name, game.id);
            events.push(GameEvent::new(
                GameEventKind::PlayerJoined,
                bound.id.clone(),
                format!("{} joined the game", bound.name),
            ));
            Ok(bound)
        })
        .await
    }

    /// Draw the words, pick the imposter and first questioner, and begin play
    pub async fn start_game(&self, game_id: &str) -> GameResult<()> {
        self.with_session(game_id, |session, events| {
            if session.game.state != GameState::Recruiting {
                return Err(GameError::precondition(format!(
                    "Cannot start game in {:?} state",
                    session.game.state
                )));
            }
            if !session.game.can_start() {
                return Err(GameError::precondition(
                    "At least three players are needed to start",
                ));
            }

            // Work on copies so a failed draw leaves the session untouched
            let mut draft = session.game.clone();
            let mut rng = session.rng.clone();
            assign_roles(&mut draft, &mut rng)?;
            draft.state = GameState::Playing;
            draft.current_round = 1;
            draft.answerer_id = None;
            draft.vote_tally.clear();
            session.game = draft;
            session.rng = rng;

            let game = &session.game;
            tracing::info!(
                "Game {} started with {} players, first questioner {}",
                game.id,
                game.players.len(),
                game.player_name(game.current_player().map(|p| p.id.as_str()))
            );
            events.push(GameEvent::new(
                GameEventKind::SessionStarted,
                game.host_id(),
                format!("{} started the game", game.host_name()),
            ));
            Ok(())
        })
        .await
    }

    /// Force the game to end and announce the outcome
    pub async fn end_game(&self, game_id: &str) -> GameResult<Outcome> {
        self.with_session(game_id, |session, events| {
            let game = &mut session.game;
            game.state = GameState::Ended;
            game.answerer_id = None;

            let outcome = game.outcome();
            tracing::info!("Game {} ended: {}", game.id, outcome);
            events.push(GameEvent::new(
                GameEventKind::SessionEnded,
                game.host_id(),
                outcome.to_string(),
            ));
            Ok(outcome)
        })
        .await
    }

    /// Discard a game that has not started yet
    pub async fn cancel_game(&self, game_id: &str) -> GameResult<()> {
        let handle = self.registry.get(game_id).await?;
        let session = handle.lock().await;
        if !self.registry.exists(game_id).await {
            return Err(GameError::SessionNotFound(game_id.to_string()));
        }

        let game = &session.game;
        if !game.can_cancel() {
            return Err(GameError::precondition(
                "Only games that are still recruiting can be cancelled",
            ));
        }

        self.registry.remove(game_id).await;
        tracing::info!("Game {} cancelled", game_id);
        self.events.dispatch(
            game,
            vec![GameEvent::new(
                GameEventKind::SessionCancelled,
                game.host_id(),
                format!("{} cancelled the game", game.host_name()),
            )],
        );
        Ok(())
    }

    /// Reopen a finished game for recruiting with a different category
    pub async fn restart_game(&self, game_id: &str) -> GameResult<()> {
        let categories = self.catalog().list_categories().await?;

        self.with_session(game_id, |session, events| {
            if session.game.state != GameState::Ended {
                return Err(GameError::precondition(
                    "Only finished games can be restarted",
                ));
            }

            let current = session.game.category.name.clone();
            let mut others: Vec<Category> = categories
                .into_iter()
                .filter(|c| c.name != current)
                .collect();
            if others.is_empty() {
                tracing::warn!(
                    "No category other than '{}' available, keeping it for game {}",
                    current,
                    session.game.id
                );
            } else {
                let index = session.rng.random_range(0..others.len());
                session.game.category = others.swap_remove(index);
            }

            let game = &mut session.game;
            game.state = GameState::Recruiting;
            game.vote_tally.clear();
            game.common_word = None;
            game.imposter_word = None;
            game.answerer_id = None;
            game.questioner_index = 0;
            game.first_questioner_index = 0;
            game.current_round = 1;
            game.used_common_words.clear();
            game.used_imposter_words.clear();
            for player in &mut game.players {
                player.clear_role();
            }

            tracing::info!(
                "Game {} restarted with category {}",
                game.id,
                game.category.name
            );
            events.push(GameEvent::new(
                GameEventKind::SessionCreated,
                game.host_id(),
                format!("{} restarted the game", game.host_name()),
            ));
            Ok(())
        })
        .await
    }
}

fn ensure_joinable(game: &Game) -> GameResult<()> {
    if game.state != GameState::Recruiting {
        return Err(GameError::precondition("Game has already started"));
    }
    if !game.can_join() {
        return Err(GameError::precondition(format!(
            "Game is full ({} players)",
            game.max_players
        )));
    }
    Ok(())
}
