use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;

/// Name shown when a message or event is not addressed to a specific player
pub const EVERYONE: &str = "everyone";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    Recruiting,
    Playing,
    Voting,
    Ended,
}

/// A named pool of candidate words, supplied by the category catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub words: BTreeSet<String>,
}

impl Category {
    pub fn new<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

/// A participant in one game.
///
/// Only the public identity (id, name, game) is serialized. Role and vote
/// fields stay on the server so a serialized player never reveals the imposter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub game_id: GameId,
    #[serde(skip)]
    pub is_imposter: bool,
    #[serde(skip)]
    pub assigned_word: Option<String>,
    #[serde(skip)]
    pub has_voted: bool,
    #[serde(skip)]
    pub voted_for: Option<PlayerId>,
}

impl Player {
    pub fn new(name: impl Into<String>, game_id: impl Into<GameId>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.into(),
            game_id: game_id.into(),
            is_imposter: false,
            assigned_word: None,
            has_voted: false,
            voted_for: None,
        }
    }

    /// Produce a copy of this player bound to `game_id`, keeping id and name
    /// and clearing everything that belongs to a previous game.
    pub fn bind_to(&self, game_id: &str) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            game_id: game_id.to_string(),
            is_imposter: false,
            assigned_word: None,
            has_voted: false,
            voted_for: None,
        }
    }

    pub(crate) fn clear_role(&mut self) {
        self.is_imposter = false;
        self.assigned_word = None;
        self.has_voted = false;
        self.voted_for = None;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Plain,
    Question,
    Answer,
}

/// A chat entry. Immutable once posted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub game_id: GameId,
    pub sender_id: PlayerId,
    pub recipient_id: Option<PlayerId>,
    pub text: String,
    pub timestamp: String,
    pub kind: MessageKind,
}

impl Message {
    fn build(
        sender: &Player,
        recipient_id: Option<PlayerId>,
        text: impl Into<String>,
        kind: MessageKind,
    ) -> Self {
        Self {
            game_id: sender.game_id.clone(),
            sender_id: sender.id.clone(),
            recipient_id,
            text: text.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
        }
    }

    /// Plain chat, to one player or to everyone
    pub fn send(sender: &Player, text: impl Into<String>, recipient: Option<&Player>) -> Self {
        Self::build(
            sender,
            recipient.map(|p| p.id.clone()),
            text,
            MessageKind::Plain,
        )
    }

    pub fn question(sender: &Player, recipient: &Player, text: impl Into<String>) -> Self {
        Self::build(
            sender,
            Some(recipient.id.clone()),
            text,
            MessageKind::Question,
        )
    }

    /// Answer addressed back to the questioner
    pub fn answer(sender: &Player, questioner_id: &str, text: impl Into<String>) -> Self {
        Self::build(
            sender,
            Some(questioner_id.to_string()),
            text,
            MessageKind::Answer,
        )
    }
}

/// All state for one running session
#[derive(Debug, Clone, Serialize)]
pub struct Game {
    pub id: GameId,
    pub state: GameState,
    /// Join order. `players[0]` is the host.
    pub players: Vec<Player>,
    pub chat: Vec<Message>,
    pub category: Category,
    #[serde(skip)]
    pub common_word: Option<String>,
    #[serde(skip)]
    pub imposter_word: Option<String>,
    pub current_round: u32,
    pub number_of_rounds: u32,
    pub questioner_index: usize,
    pub first_questioner_index: usize,
    /// Set while a question waits for its answer
    pub answerer_id: Option<PlayerId>,
    pub vote_tally: HashMap<PlayerId, u32>,
    #[serde(skip)]
    pub used_common_words: BTreeSet<String>,
    #[serde(skip)]
    pub used_imposter_words: BTreeSet<String>,
    pub max_players: usize,
}

impl Game {
    pub fn new(id: GameId, category: Category, number_of_rounds: u32, max_players: usize) -> Self {
        Self {
            id,
            state: GameState::Recruiting,
            players: Vec::new(),
            chat: Vec::new(),
            category,
            common_word: None,
            imposter_word: None,
            current_round: 1,
            number_of_rounds,
            questioner_index: 0,
            first_questioner_index: 0,
            answerer_id: None,
            vote_tally: HashMap::new(),
            used_common_words: BTreeSet::new(),
            used_imposter_words: BTreeSet::new(),
            max_players,
        }
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.first()
    }

    /// Host id, or empty once every player has left
    pub(crate) fn host_id(&self) -> PlayerId {
        self.host().map(|p| p.id.clone()).unwrap_or_default()
    }

    pub(crate) fn host_name(&self) -> &str {
        self.host().map(|p| p.name.as_str()).unwrap_or("The host")
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.questioner_index)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub(crate) fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn imposter(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_imposter)
    }

    /// Display name for a player id, or "everyone" when there is none
    pub fn player_name(&self, player_id: Option<&str>) -> &str {
        player_id
            .and_then(|id| self.player(id))
            .map(|p| p.name.as_str())
            .unwrap_or(EVERYONE)
    }

    pub fn has_player_named(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    /// Number of players who have cast a vote
    pub fn vote_count(&self) -> usize {
        self.players.iter().filter(|p| p.has_voted).count()
    }

    pub fn total_votes(&self) -> u32 {
        self.vote_tally.values().sum()
    }

    pub fn last_question(&self) -> Option<&Message> {
        self.chat
            .iter()
            .rev()
            .find(|m| m.kind == MessageKind::Question)
    }

    pub fn can_join(&self) -> bool {
        self.players.len() < self.max_players
    }

    pub fn can_start(&self) -> bool {
        self.state == GameState::Recruiting && self.players.len() > 2
    }

    pub fn can_cancel(&self) -> bool {
        self.state == GameState::Recruiting
    }

    pub fn is_voting_phase(&self) -> bool {
        self.state == GameState::Voting
    }

    /// True when `player_id` holds the questioner cursor and no question is pending
    pub fn is_my_turn(&self, player_id: &str) -> bool {
        self.state == GameState::Playing
            && self.answerer_id.is_none()
            && self.current_player().is_some_and(|p| p.id == player_id)
    }

    /// Short instruction describing who should act next while playing
    pub fn next_move(&self) -> String {
        if self.state != GameState::Playing {
            return String::new();
        }
        match (&self.answerer_id, self.last_question()) {
            (Some(_), Some(question)) => format!(
                "{} should answer {}",
                self.player_name(question.recipient_id.as_deref()),
                self.player_name(Some(question.sender_id.as_str()))
            ),
            _ => match self.current_player() {
                Some(p) => format!("{} to lead the interrogation", p.name),
                None => String::new(),
            },
        }
    }

    pub fn status_line(&self) -> String {
        match self.state {
            GameState::Recruiting => "Waiting for players to join".to_string(),
            GameState::Playing => format!("Round {}", self.current_round),
            GameState::Voting => format!("Votes: {}", self.vote_count()),
            GameState::Ended => "Game Over".to_string(),
        }
    }
}

/// How a game turned out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Still recruiting or playing
    NotFinished,
    /// Ended while votes are still being collected
    AwaitingVotes,
    NoImposter,
    Caught { imposter: String },
    Escaped { imposter: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NotFinished => Ok(()),
            Outcome::AwaitingVotes => write!(f, "Waiting on final votes"),
            Outcome::NoImposter => write!(f, "No imposter found"),
            Outcome::Caught { imposter } => {
                write!(f, "{imposter} was the imposter and was successfully identified")
            }
            Outcome::Escaped { imposter } => {
                write!(f, "{imposter} was the imposter and evaded detection")
            }
        }
    }
}
