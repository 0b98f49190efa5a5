use super::turn::advance_round;
use super::vote::withdraw_vote;
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::events::{GameEvent, GameEventKind};
use crate::types::*;

/// Where a cursor into `players` lands after the player at `removed` is taken out
fn shift_index(index: usize, removed: usize, remaining: usize) -> usize {
    if remaining == 0 {
        0
    } else if removed < index {
        index - 1
    } else if index >= remaining {
        0
    } else {
        index
    }
}

impl AppState {
    /// Remove a player from a game, e.g. after they disconnect
    pub async fn remove_player(&self, game_id: &str, player_id: &str) -> GameResult<Player> {
        self.with_session(game_id, |session, events| {
            let game = &mut session.game;
            let Some(position) = game.players.iter().position(|p| p.id == player_id) else {
                return Err(GameError::PlayerNotFound(player_id.to_string()));
            };

            let was_questioner = position == game.questioner_index;
            let was_first = position == game.first_questioner_index;

            // A pending question dies with either side of it
            if game.answerer_id.as_deref() == Some(player_id) || was_questioner {
                game.answerer_id = None;
            }

            let removed = game.players.remove(position);
            let remaining = game.players.len();
            game.questioner_index = shift_index(game.questioner_index, position, remaining);
            game.first_questioner_index =
                shift_index(game.first_questioner_index, position, remaining);

            if let Some(target) = &removed.voted_for {
                withdraw_vote(game, target);
            }
            game.vote_tally.remove(&removed.id);
            for voter in game
                .players
                .iter_mut()
                .filter(|p| p.voted_for.as_deref() == Some(removed.id.as_str()))
            {
                voter.has_voted = false;
                voter.voted_for = None;
            }

            tracing::info!(
                "{} removed from game {} ({} players left)",
                removed.name,
                game.id,
                remaining
            );
            events.push(GameEvent::new(
                GameEventKind::PlayerRemoved,
                removed.id.clone(),
                format!("{} has disappeared", removed.name),
            ));

            if removed.is_imposter && game.state != GameState::Recruiting {
                game.state = GameState::Ended;
                game.answerer_id = None;
                tracing::info!("Game {} ended: the imposter left", game.id);
            } else if game.state == GameState::Voting
                && !game.players.is_empty()
                && game.players.iter().all(|p| p.has_voted)
            {
                game.state = GameState::Ended;
                tracing::info!("Game {} ended: {}", game.id, game.outcome());
            } else if game.state == GameState::Playing
                && remaining > 0
                && was_questioner
                && !was_first
                && game.questioner_index == game.first_questioner_index
            {
                // The departing player held the last turn of the rotation
                advance_round(game, events);
            }

            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::events::ListenerResult;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_shift_index() {
        // Removed before the cursor: cursor follows its player
        assert_eq!(shift_index(3, 1, 4), 2);
        // Removed after the cursor: unchanged
        assert_eq!(shift_index(1, 3, 4), 1);
        // Removed at the cursor: next player takes the slot
        assert_eq!(shift_index(2, 2, 4), 2);
        // Removed at the cursor in last position: wraps
        assert_eq!(shift_index(4, 4, 4), 0);
        assert_eq!(shift_index(0, 0, 0), 0);
    }

    /// Started game whose imposter is the first questioner, so later
    /// questioners can leave without ending the game
    async fn game_with_imposter_first(state: &AppState, names: &[&str], rounds: u32) -> Game {
        let players = game_with_players(state, names, rounds).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();

        let handle = state.registry.get(&game_id).await.unwrap();
        let mut session = handle.lock().await;
        let first = session.game.first_questioner_index;
        for (i, player) in session.game.players.iter_mut().enumerate() {
            player.is_imposter = i == first;
        }
        session.game.clone()
    }

    #[tokio::test]
    async fn test_last_questioner_leaving_completes_the_round() {
        let state = state();
        let game = game_with_imposter_first(&state, &["Alice", "Bob", "Carol", "Dave"], 1).await;
        for _ in 0..3 {
            state.advance_turn(&game.id).await.unwrap();
        }
        let before = state.get_game(&game.id).await.unwrap();
        assert_eq!(before.current_round, 1);
        assert_eq!(
            before.questioner_index,
            (before.first_questioner_index + 3) % 4
        );
        let last = before.current_player().unwrap().clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        state.subscribe(Arc::new(move |_: &Game, e: &GameEvent| -> ListenerResult {
            sink.lock().unwrap().push(e.kind);
            Ok(())
        }));

        state.remove_player(&game.id, &last.id).await.unwrap();

        let after = state.get_game(&game.id).await.unwrap();
        assert_eq!(after.state, GameState::Voting);
        assert_eq!(after.current_round, 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![GameEventKind::PlayerRemoved, GameEventKind::PlayComplete]
        );
    }

    #[tokio::test]
    async fn test_last_questioner_leaving_mid_game_starts_next_round() {
        let state = state();
        let game = game_with_imposter_first(&state, &["Alice", "Bob", "Carol", "Dave"], 2).await;
        for _ in 0..3 {
            state.advance_turn(&game.id).await.unwrap();
        }
        let last = state
            .get_game(&game.id)
            .await
            .unwrap()
            .current_player()
            .unwrap()
            .clone();

        state.remove_player(&game.id, &last.id).await.unwrap();

        let after = state.get_game(&game.id).await.unwrap();
        assert_eq!(after.state, GameState::Playing);
        assert_eq!(after.current_round, 2);
        assert_eq!(after.questioner_index, after.first_questioner_index);

        // One more full rotation of the three survivors finishes the game
        for _ in 0..3 {
            state.advance_turn(&game.id).await.unwrap();
        }
        assert_eq!(
            state.get_game(&game.id).await.unwrap().state,
            GameState::Voting
        );
    }

    #[tokio::test]
    async fn test_first_questioner_leaving_does_not_count_a_round() {
        let state = state();
        let players = game_with_players(&state, &["Alice", "Bob", "Carol", "Dave"], 1).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();

        // Make the imposter someone other than the first questioner
        let handle = state.registry.get(&game_id).await.unwrap();
        let first = {
            let mut session = handle.lock().await;
            let first = session.game.first_questioner_index;
            let len = session.game.players.len();
            for (i, player) in session.game.players.iter_mut().enumerate() {
                player.is_imposter = i == (first + 1) % len;
            }
            session.game.players[first].clone()
        };

        state.remove_player(&game_id, &first.id).await.unwrap();

        let after = state.get_game(&game_id).await.unwrap();
        assert_eq!(after.state, GameState::Playing);
        assert_eq!(after.current_round, 1);
        assert_eq!(after.questioner_index, after.first_questioner_index);
    }

    #[tokio::test]
    async fn test_remove_player_while_recruiting() {
        let state = state();
        let players = game_with_players(&state, &["Alice", "Bob", "Carol"], 2).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        state.subscribe(Arc::new(move |_: &Game, e: &GameEvent| -> ListenerResult {
            sink.lock().unwrap().push(e.clone());
            Ok(())
        }));

        let removed = state
            .remove_player(&players[0].game_id, &players[1].id)
            .await
            .unwrap();
        assert_eq!(removed.name, "Bob");

        let game = state.get_game(&players[0].game_id).await.unwrap();
        let names: Vec<_> = game.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Carol"]);
        assert_eq!(game.state, GameState::Recruiting);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, GameEventKind::PlayerRemoved);
        assert_eq!(seen[0].message, "Bob has disappeared");
    }

    #[tokio::test]
    async fn test_remove_unknown_player() {
        let state = state();
        let players = game_with_players(&state, &["Alice", "Bob"], 2).await;

        let result = state.remove_player(&players[0].game_id, "ghost").await;
        assert!(matches!(result, Err(GameError::PlayerNotFound(_))));
        assert_eq!(
            state.get_game(&players[0].game_id).await.unwrap().players.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_remove_imposter_ends_game() {
        let state = state();
        let game = started_game(&state, 2).await;
        let imposter = game.imposter().unwrap().clone();

        state.remove_player(&game.id, &imposter.id).await.unwrap();

        let game = state.get_game(&game.id).await.unwrap();
        assert_eq!(game.state, GameState::Ended);
        assert_eq!(game.outcome(), Outcome::NoImposter);
        assert_eq!(game.outcome().to_string(), "No imposter found");
    }

    #[tokio::test]
    async fn test_remove_keeps_cursor_in_range_while_playing() {
        let state = state();
        let players =
            game_with_players(&state, &["Alice", "Bob", "Carol", "Dave", "Erin"], 2).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();
        let game = state.get_game(&game_id).await.unwrap();

        // Drop an innocent who is not the current questioner
        let current = game.current_player().unwrap().id.clone();
        let victim = game
            .players
            .iter()
            .find(|p| !p.is_imposter && p.id != current)
            .unwrap()
            .clone();

        state.remove_player(&game_id, &victim.id).await.unwrap();

        let after = state.get_game(&game_id).await.unwrap();
        assert_eq!(after.state, GameState::Playing);
        assert_eq!(after.players.len(), 4);
        assert!(after.questioner_index < after.players.len());
        assert!(after.first_questioner_index < after.players.len());
        assert_eq!(after.current_player().unwrap().id, current);
    }

    #[tokio::test]
    async fn test_remove_answerer_clears_pending_question() {
        let state = state();
        let players =
            game_with_players(&state, &["Alice", "Bob", "Carol", "Dave"], 2).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();
        let game = state.get_game(&game_id).await.unwrap();

        let asker = game.current_player().unwrap().clone();
        let target = game
            .players
            .iter()
            .find(|p| p.id != asker.id && !p.is_imposter)
            .cloned()
            .unwrap();

        state
            .post_message(Message::question(&asker, &target, "Is it green?"))
            .await
            .unwrap();
        state.remove_player(&game_id, &target.id).await.unwrap();

        let after = state.get_game(&game_id).await.unwrap();
        assert!(after.answerer_id.is_none());
        assert_eq!(after.state, GameState::Playing);
        assert!(after.is_my_turn(&asker.id));
    }

    #[tokio::test]
    async fn test_remove_voted_for_player_resets_voters() {
        let state = state();
        let players =
            game_with_players(&state, &["Alice", "Bob", "Carol", "Dave"], 1).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();
        for _ in 0..players.len() {
            state.advance_turn(&game_id).await.unwrap();
        }
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.state, GameState::Voting);

        let innocents: Vec<_> = game
            .players
            .iter()
            .filter(|p| !p.is_imposter)
            .cloned()
            .collect();
        let (target, voter, other) = (&innocents[0], &innocents[1], &innocents[2]);

        state.submit_vote(&game_id, &voter.id, &target.id).await.unwrap();
        state.submit_vote(&game_id, &target.id, &other.id).await.unwrap();

        state.remove_player(&game_id, &target.id).await.unwrap();

        let after = state.get_game(&game_id).await.unwrap();
        assert_eq!(after.state, GameState::Voting);
        assert_eq!(after.total_votes(), 0);
        assert!(after.vote_tally.is_empty());
        let voter = after.player(&voter.id).unwrap();
        assert!(!voter.has_voted);
        assert!(voter.voted_for.is_none());
    }

    #[tokio::test]
    async fn test_remove_last_holdout_ends_voting() {
        let state = state();
        let players =
            game_with_players(&state, &["Alice", "Bob", "Carol", "Dave"], 1).await;
        let game_id = players[0].game_id.clone();
        state.start_game(&game_id).await.unwrap();
        for _ in 0..players.len() {
            state.advance_turn(&game_id).await.unwrap();
        }
        let game = state.get_game(&game_id).await.unwrap();
        let imposter = game.imposter().unwrap().clone();
        let innocents: Vec<_> = game
            .players
            .iter()
            .filter(|p| !p.is_imposter)
            .cloned()
            .collect();

        // Everyone but the last innocent votes for the imposter
        state.submit_vote(&game_id, &imposter.id, &innocents[0].id).await.unwrap();
        state.submit_vote(&game_id, &innocents[0].id, &imposter.id).await.unwrap();
        state.submit_vote(&game_id, &innocents[1].id, &imposter.id).await.unwrap();

        state.remove_player(&game_id, &innocents[2].id).await.unwrap();

        let after = state.get_game(&game_id).await.unwrap();
        assert_eq!(after.state, GameState::Ended);
        assert!(matches!(after.outcome(), Outcome::Caught { .. }));
    }
}
