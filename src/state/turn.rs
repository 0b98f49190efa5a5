use super::AppState;
use crate::error::{GameError, GameResult};
use crate::events::{GameEvent, GameEventKind};
use crate::types::*;

/// Hand the questioner cursor to the next player, closing the round after a full rotation
pub(crate) fn advance_turn(game: &mut Game, events: &mut Vec<GameEvent>) {
    let Some(finished) = game.current_player() else {
        return;
    };
    events.push(GameEvent::new(
        GameEventKind::TurnCompleted,
        finished.id.clone(),
        format!("{} has completed their turn", finished.name),
    ));

    game.questioner_index = (game.questioner_index + 1) % game.players.len();
    if game.questioner_index == game.first_questioner_index {
        advance_round(game, events);
    }
}

/// Count a completed rotation; once all rounds are played the game moves to voting
pub(crate) fn advance_round(game: &mut Game, events: &mut Vec<GameEvent>) {
    game.current_round += 1;

    if game.current_round > game.number_of_rounds {
        game.state = GameState::Voting;
        game.answerer_id = None;
        tracing::info!(
            "Game {} finished {} rounds, voting opens",
            game.id,
            game.number_of_rounds
        );
        events.push(GameEvent::new(
            GameEventKind::PlayComplete,
            game.host_id(),
            "Players to vote",
        ));
    } else if let Some(next) = game.current_player() {
        tracing::debug!("Game {} round {} begins", game.id, game.current_round);
        events.push(GameEvent::new(
            GameEventKind::NextRound,
            next.id.clone(),
            format!("{} to play next", next.name),
        ));
    }
}

impl AppState {
    /// End the current questioner's turn without an answer (host skip)
    pub async fn advance_turn(&self, game_id: &str) -> GameResult<()> {
        self.with_session(game_id, |session, events| {
            let game = &mut session.game;
            if game.state != GameState::Playing {
                return Err(GameError::precondition(format!(
                    "Turns only advance while playing, game is {:?}",
                    game.state
                )));
            }
            if game.players.is_empty() {
                return Err(GameError::precondition("Game has no players"));
            }

            // A skipped turn abandons any unanswered question
            game.answerer_id = None;
            advance_turn(game, events);
            Ok(())
        })
        .await
    }
}
