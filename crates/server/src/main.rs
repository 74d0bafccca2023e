mod api;
mod router;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use amber_relay::{BackendDescriptor, Relay};

fn load_config() -> amber_core::Config {
    amber_core::config::load_dotenv();
    amber_core::Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let config = load_config();
    config.log_summary();

    let backend = BackendDescriptor::select(&config.backend, &config.aws)
        .context("failed to configure agent backend")?;
    info!(mode = %backend.mode(), url = %backend.url(), "agent backend selected");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(state::AppState {
        relay: Relay::new(Arc::new(backend)),
        config,
    });
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
