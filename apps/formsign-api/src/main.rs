//! FormSign API Server

use anyhow::Result;
use formsign_api::{config::Config, router, state::AppState};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("formsign_api=info".parse()?)
                .add_directive("formsign_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = Config::from_env();
    let addr = config.addr();

    info!("Initializing FormSign API...");
    let state = Arc::new(AppState::new(config).await?);
    let app = router(state);

    info!("Starting FormSign API on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
