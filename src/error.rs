use crate::catalog::CatalogError;
use crate::types::{GameId, PlayerId};

/// Result type for game session operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors returned by session operations. A failed operation leaves the session untouched.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Game not found: {0}")]
    SessionNotFound(GameId),

    #[error("Duplicate user name: {0}")]
    DuplicateName(String),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("No available words left in category '{0}'")]
    CategoryExhausted(String),

    #[error("{0}")]
    InvalidPrecondition(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl GameError {
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        Self::InvalidPrecondition(msg.into())
    }
}
