use std::net::SocketAddr;
use std::sync::Arc;

use rag_chat::api::{create_router, AppState};
use rag_chat::infrastructure::{bootstrap, init_tracing, AppConfig, ConfiguredResponderFactory};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("api=debug,rag_chat=debug,tower_http=debug");

    let config = AppConfig::load()?;
    let factory = Arc::new(ConfiguredResponderFactory::new(Arc::new(config.clone())));
    let mut state = AppState::new(config, factory);
    if let Some(monitor) = bootstrap::interaction_log(&state.config.config.monitoring) {
        info!(path = %monitor.path().display(), "interaction monitoring enabled");
        state = state.with_monitor(monitor);
    }

    let server = &state.config.config.server;
    let addr = SocketAddr::new(server.host.parse()?, server.port);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
