use anyhow::Context;

use profile_api::store::Store;
use profile_api::{app, config, images, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting profile API in {:?} mode", config.environment);

    let store = Store::connect(&config.database)
        .await
        .context("failed to connect to document store")?;
    store
        .ensure_collections()
        .await
        .context("failed to prepare collections")?;

    let images = images::from_config(&config.images)
        .await
        .context("failed to initialize image store")?;

    let state = AppState { store, images };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
