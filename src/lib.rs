// Public API for integration tests and embedding in a transport layer

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod state;
pub mod types;

pub use error::{GameError, GameResult};
pub use state::AppState;
