use crate::error::{GameError, GameResult};
use crate::events::{GameEvent, GameEventKind};
use crate::state::AppState;
use crate::types::*;

impl Game {
    /// Votes received by `player_id`
    pub fn votes_against(&self, player_id: &str) -> u32 {
        self.vote_tally.get(player_id).copied().unwrap_or(0)
    }

    /// Result of the game.
    ///
    /// The imposter escapes when more votes went to other players than to the
    /// imposter; a tie or a majority against the imposter means they were caught.
    pub fn outcome(&self) -> Outcome {
        match self.state {
            GameState::Recruiting | GameState::Playing => return Outcome::NotFinished,
            GameState::Voting => return Outcome::AwaitingVotes,
            GameState::Ended => {}
        }

        let Some(imposter) = self.imposter() else {
            return Outcome::NoImposter;
        };

        let against_imposter = self.votes_against(&imposter.id);
        let against_others = self.total_votes() - against_imposter;
        let imposter = imposter.name.clone();

        if against_others > against_imposter {
            Outcome::Escaped { imposter }
        } else {
            Outcome::Caught { imposter }
        }
    }
}

/// Take back a vote previously given to `player_id`
pub(crate) fn withdraw_vote(game: &mut Game, player_id: &str) {
    if let Some(count) = game.vote_tally.get_mut(player_id) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            game.vote_tally.remove(player_id);
        }
    }
}

impl AppState {
    /// Record `voter_id`'s vote for `voted_id`. Voting again moves the vote.
    pub async fn submit_vote(&self, game_id: &str, voter_id: &str, voted_id: &str) -> GameResult<()> {
        self.with_session(game_id, |session, events| {
            let game = &mut session.game;
            if game.state != GameState::Voting {
                return Err(GameError::precondition(format!(
                    "Votes are not accepted in {:?} state",
                    game.state
                )));
            }
            let previous = match game.player(voter_id) {
                Some(voter) => voter.voted_for.clone(),
                None => return Err(GameError::PlayerNotFound(voter_id.to_string())),
            };
            if game.player(voted_id).is_none() {
                return Err(GameError::PlayerNotFound(voted_id.to_string()));
            }

            if let Some(previous) = previous {
                withdraw_vote(game, &previous);
            }
            *game.vote_tally.entry(voted_id.to_string()).or_insert(0) += 1;

            let voter_name = match game.player_mut(voter_id) {
                Some(voter) => {
                    voter.has_voted = true;
                    voter.voted_for = Some(voted_id.to_string());
                    voter.name.clone()
                }
                None => return Err(GameError::PlayerNotFound(voter_id.to_string())),
            };

            tracing::debug!(
                "Game {}: {} voted ({} of {} in)",
                game.id,
                voter_name,
                game.vote_count(),
                game.players.len()
            );
            events.push(GameEvent::new(
                GameEventKind::Voted,
                voter_id.to_string(),
                format!("{} voted", voter_name),
            ));

            if game.players.iter().all(|p| p.has_voted) {
                game.state = GameState::Ended;
                tracing::info!("Game {} ended: {}", game.id, game.outcome());
            }
            Ok(())
        })
        .await
    }
}
