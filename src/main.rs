use playgen::config::Config;
use playgen::services::storage::{PENDING_AUTH_FILE, SESSION_FILE};
use playgen::services::{AuthService, FileStore, SpotifyClient};
use playgen::ui::{self, UiController};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the terminal UI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,playgen=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let durable = Arc::new(FileStore::open(config.storage_dir.join(SESSION_FILE))?);
    let transient = Arc::new(FileStore::open(config.storage_dir.join(PENDING_AUTH_FILE))?);
    tracing::info!("Session stored in {}", durable.path().display());

    let auth_service = Arc::new(AuthService::new(&config, durable, transient));
    let spotify_client = Arc::new(SpotifyClient::new(&config, auth_service.clone()));

    let (addr, path) = config.callback_address()?;
    let callback_server =
        playgen::api::start_callback_server(&addr, &path, auth_service.clone()).await?;

    // Subscribe before restoring so the restored session reaches the UI
    let auth_events = auth_service.subscribe();
    let state = auth_service.restore().await;
    tracing::info!("Auth state at startup: {:?}", state);

    let controller = UiController::new(
        spotify_client,
        auth_service,
        config.search_limit,
        config.recommendation_limit,
    );
    ui::terminal::run(controller, auth_events).await?;

    callback_server.abort();
    Ok(())
}
