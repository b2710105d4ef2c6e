use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rollcall::config::{Cli, Config};
use rollcall::db;
use rollcall::routes;
use rollcall::state::AppState;

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
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    tracing::info!("Backend: {}", config.backend.base_url);

    // Initialize database
    let db_path = config
        .db_path()
        .cloned()
        .unwrap_or_else(|| data_dir.join("rollcall.db"));
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;

    let state = AppState::new(config.clone(), pool)?;
    if let Some(principal) = state.principals.principal()? {
        tracing::info!("Resuming login for {}", principal.email);
    }

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
