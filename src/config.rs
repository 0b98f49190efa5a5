use std::path::PathBuf;
use std::str::FromStr;

/// Runtime configuration for the session core
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Membership cap per game
    pub max_players: usize,
    /// Length of the human-typeable game code
    pub code_length: usize,
    /// Rounds used when the caller does not pick a number
    pub default_rounds: u32,
    /// Fixed RNG seed (None = OS entropy)
    pub seed: Option<u64>,
    /// Path of the JSON category catalog
    pub categories_path: PathBuf,
    /// Capacity of the event broadcast channel
    pub event_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_players: 9,
            code_length: 6,
            default_rounds: 4,
            seed: None,
            categories_path: PathBuf::from("data/categories.json"),
            event_buffer: 100,
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            max_players: parse_env("SKYFALL_MAX_PLAYERS", defaults.max_players, |v| *v >= 3),
            code_length: parse_env("SKYFALL_CODE_LENGTH", defaults.code_length, |v| *v >= 4),
            default_rounds: parse_env("SKYFALL_DEFAULT_ROUNDS", defaults.default_rounds, |v| {
                *v >= 1
            }),
            seed: std::env::var("SKYFALL_SEED")
                .ok()
                .and_then(|v| match v.trim().parse() {
                    Ok(seed) => Some(seed),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid SKYFALL_SEED value '{}'", v);
                        None
                    }
                }),
            categories_path: std::env::var("SKYFALL_CATEGORIES")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.categories_path),
            event_buffer: parse_env("SKYFALL_EVENT_BUFFER", defaults.event_buffer, |v| *v > 0),
        };

        tracing::debug!("Loaded config: {:?}", config);
        config
    }
}

fn parse_env<T>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if valid(&value) => value,
            _ => {
                tracing::warn!(
                    "Invalid value '{}' for {}, using default {}",
                    raw,
                    key,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}
