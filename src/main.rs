//! oidc-lab server binary

use anyhow::Context;
use oidc_lab::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    oidc_lab::observability::init()?;

    let config = AppConfig::load().context("failed to load configuration")?;

    if let Some(hint) = config.setup_hint() {
        tracing::warn!(%hint, "running unconfigured; the home page will show setup instructions");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let redirect_uri = config.redirect_uri();

    let state = AppState::from_config(config)
        .await
        .context("failed to initialize application state")?;
    let app = oidc_lab::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %bind_addr, %redirect_uri, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
