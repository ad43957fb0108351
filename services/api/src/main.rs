mod auth;
mod config;
mod error;
mod handlers;
mod rate_limit;
mod router;
mod state;

use config::ApiConfig;
use router::create_router;
use state::AppState;
use std::net::SocketAddr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting fleet tracking API service");

    let config = ApiConfig::from_env();
    let state = AppState::new(&config)?;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
