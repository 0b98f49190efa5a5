use super::turn::advance_turn;
use super::AppState;
use crate::error::{GameError, GameResult};
use crate::events::{GameEvent, GameEventKind};
use crate::types::*;

/// Check that a message may be posted right now
fn validate_message(game: &Game, message: &Message) -> GameResult<()> {
    if game.player(&message.sender_id).is_none() {
        return Err(GameError::PlayerNotFound(message.sender_id.clone()));
    }
    if let Some(recipient) = &message.recipient_id {
        if game.player(recipient).is_none() {
            return Err(GameError::PlayerNotFound(recipient.clone()));
        }
    }

    match message.kind {
        MessageKind::Plain => Ok(()),
        MessageKind::Question => {
            if game.state != GameState::Playing {
                return Err(GameError::precondition("Questions can only be asked while playing"));
            }
            let Some(recipient) = &message.recipient_id else {
                return Err(GameError::precondition("A question needs a recipient"));
            };
            if *recipient == message.sender_id {
                return Err(GameError::precondition("Players cannot question themselves"));
            }
            if game.answerer_id.is_some() {
                return Err(GameError::precondition(
                    "The previous question has not been answered yet",
                ));
            }
            if !game.is_my_turn(&message.sender_id) {
                return Err(GameError::precondition(format!(
                    "It is {}'s turn to ask",
                    game.player_name(game.current_player().map(|p| p.id.as_str()))
                )));
            }
            Ok(())
        }
        MessageKind::Answer => {
            if game.state != GameState::Playing {
                return Err(GameError::precondition("Answers can only be given while playing"));
            }
            if game.answerer_id.as_deref() != Some(message.sender_id.as_str()) {
                return Err(GameError::precondition(
                    "Only the player who was asked can answer",
                ));
            }
            let questioner = game.last_question().map(|q| q.sender_id.as_str());
            if message.recipient_id.as_deref() != questioner {
                return Err(GameError::precondition(format!(
                    "Answers go back to {}",
                    game.player_name(questioner)
                )));
            }
            Ok(())
        }
    }
}

impl AppState {
    /// Append a message to the game chat. Answers also end the questioner's turn.
    pub async fn post_message(&self, message: Message) -> GameResult<()> {
        let game_id = message.game_id.clone();
        self.with_session(&game_id, |session, events| {
            let game = &mut session.game;
            validate_message(game, &message)?;

            let sender = game.player_name(Some(message.sender_id.as_str())).to_string();
            let recipient = game
                .player_name(message.recipient_id.as_deref())
                .to_string();
            let kind = message.kind;
            let sender_id = message.sender_id.clone();
            let recipient_id = message.recipient_id.clone();
            game.chat.push(message);

            match kind {
                MessageKind::Question => {
                    game.answerer_id = recipient_id;
                    tracing::debug!("Game {}: {} asked {}", game.id, sender, recipient);
                    events.push(GameEvent::new(
                        GameEventKind::QuestionAsked,
                        sender_id,
                        format!("{} asked {}", sender, recipient),
                    ));
                }
                MessageKind::Answer => {
                    game.answerer_id = None;
                    tracing::debug!("Game {}: {} answered {}", game.id, sender, recipient);
                    events.push(GameEvent::new(
                        GameEventKind::QuestionAnswered,
                        sender_id,
                        format!("{} answered {}", sender, recipient),
                    ));
                    advance_turn(game, events);
                }
                MessageKind::Plain => {
                    let text = if recipient_id.is_some() {
                        format!("{} said to {}", sender, recipient)
                    } else {
                        format!("{} sent a message", sender)
                    };
                    events.push(GameEvent::new(GameEventKind::MessageSent, sender_id, text));
                }
            }
            Ok(())
        })
        .await
    }
}
