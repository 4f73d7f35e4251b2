use std::net::SocketAddr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use yotei_server::config::ServerConfig;
use yotei_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config);
    let app = yotei_server::app(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("yotei-server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
