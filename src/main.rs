use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinelog_api::api::{create_router, AppState};
use cinelog_api::config::Config;
use cinelog_api::storage::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state = match &config.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL store");
            AppState::from_store(Arc::new(PostgresStore::connect(url).await?))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory store");
            AppState::in_memory()
        }
    };

    let app = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
