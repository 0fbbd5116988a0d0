use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dinespot::auth::{self, HttpIdentityProvider};
use dinespot::config::{Cli, Config};
use dinespot::db;
use dinespot::places::google::GooglePlacesClient;
use dinespot::places::mapbox::MapboxGeocoder;
use dinespot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;
    let purged = auth::session::purge_expired(&pool)?;
    if purged > 0 {
        tracing::info!("Purged {} expired sessions", purged);
    }

    // Outbound services
    if config.places.api_key.is_none() {
        tracing::warn!("No places API key configured; restaurant search will fail");
    }
    if config.geocoding.access_token.is_none() {
        tracing::warn!("No geocoding token configured; reverse geocoding will fail");
    }
    let places = GooglePlacesClient::new(&config.places)?;
    let geocoder = MapboxGeocoder::new(&config.geocoding)?;
    let identity = HttpIdentityProvider::new(&config.auth);

    let state = AppState::new(
        pool,
        config.clone(),
        Arc::new(places),
        Arc::new(geocoder),
        Arc::new(identity),
    );
    let app = dinespot::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
