// Score Portal - Web Server Entry Point
//
// Usage: SECRET_KEY=... cargo run --bin server

use score_portal::{AppState, Config, DatasetState, MemoryUserRepo};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default log level: debug for our crate, warn for others
                "score_portal=debug,tower_http=info,warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting score portal...");

    // Configuration from environment; refuses to start without SECRET_KEY.
    let config = Config::from_env()?;
    tracing::info!("Configuration:");
    tracing::info!("  DATA_PATH: {}", config.data_path.display());
    tracing::info!("  PORT: {}", config.port);

    // One-time blocking dataset load. Failure leaves the dataset in an
    // explicit unavailable state; the server still starts.
    let dataset = DatasetState::load_or_unavailable(&config.data_path);

    let users = Arc::new(MemoryUserRepo::default());
    let state = AppState::new(dataset, users, &config.secret_key);
    let app = score_portal::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
