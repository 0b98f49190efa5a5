use rand::Rng;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyfall::catalog::{CategoryCatalog, JsonFileCatalog};
use skyfall::config::AppConfig;
use skyfall::events::{GameEvent, ListenerResult};
use skyfall::types::{Game, GameState, Message};
use skyfall::{AppState, GameResult};

/// Computer-controlled players joining the host
const AGENTS: usize = 3;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyfall=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Skyfall...");

    let config = AppConfig::from_env();
    let catalog = Arc::new(JsonFileCatalog::new(config.categories_path.clone()));
    let rounds = config.default_rounds;
    let state = AppState::new(catalog, config);

    state.subscribe(Arc::new(|game: &Game, event: &GameEvent| -> ListenerResult {
        tracing::info!("[{}] {} ({})", game.id, event.message, game.status_line());
        Ok(())
    }));

    // Stand-in for a transport layer forwarding notifications to clients
    let mut rx = state.notifications();
    let forwarder = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(notification) => match serde_json::to_string(&notification) {
                    Ok(json) => tracing::debug!("notify {}", json),
                    Err(e) => tracing::warn!("Failed to serialize notification: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Notification consumer lagged, {} skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    if let Err(e) = play_demo(&state, rounds).await {
        tracing::error!("Demo game failed: {}", e);
    }

    drop(state);
    let _ = forwarder.await;
}

/// Play one complete game between the host and a few agents
async fn play_demo(state: &AppState, rounds: u32) -> GameResult<()> {
    let categories = state.catalog().list_categories().await?;
    let Some(category) = categories.first() else {
        tracing::error!("Category catalog is empty, nothing to play");
        return Ok(());
    };

    let host = state.create_game("Host", &category.name, rounds).await?;
    let game_id = host.game_id.clone();

    for i in 0..AGENTS {
        let name = petname::petname(2, " ").unwrap_or_else(|| format!("Agent {}", i + 1));
        let player = state.join_game(&game_id, &name).await?;
        state
            .post_message(Message::send(&player, "Hello everyone", None))
            .await?;
    }

    state.start_game(&game_id).await?;

    loop {
        let game = state.get_game(&game_id).await?;
        if game.state != GameState::Playing {
            break;
        }
        tracing::info!("{}", game.next_move());

        let Some(asker) = game.current_player().cloned() else {
            break;
        };
        let target_index = (game.questioner_index + 1) % game.players.len();
        let target = game.players[target_index].clone();

        state
            .post_message(Message::question(
                &asker,
                &target,
                format!("{}, describe your word in one sentence", target.name),
            ))
            .await?;
        state
            .post_message(Message::answer(
                &target,
                &asker.id,
                "It is something you would recognise instantly",
            ))
            .await?;
    }

    let game = state.get_game(&game_id).await?;
    let ballots: Vec<_> = {
        let mut rng = rand::rng();
        game.players
            .iter()
            .map(|voter| {
                let others: Vec<_> = game.players.iter().filter(|p| p.id != voter.id).collect();
                let choice = others[rng.random_range(0..others.len())];
                (voter.id.clone(), choice.id.clone())
            })
            .collect()
    };

    let votes = ballots
        .iter()
        .map(|(voter, choice)| state.submit_vote(&game_id, voter, choice));
    for result in futures::future::join_all(votes).await {
        result?;
    }

    let game = state.get_game(&game_id).await?;
    tracing::info!("{}: {}", game.status_line(), game.outcome());
    Ok(())
}
