//! Server startup and lifecycle

use crate::{routes, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;

/// Run the sealdrop server until the process is stopped
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::new(config.clone()).await?;
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("sealdrop server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run with graceful shutdown on the given signal
pub async fn run_server_with_shutdown(
    config: ServerConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = AppState::new(config.clone()).await?;
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("sealdrop server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("server shutdown complete");
    Ok(())
}
