use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ssg_core::{chat::correlator::Correlator, config::Config};

use crate::handlers;

/// Shared application state.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub correlator: Arc<Correlator>,
    /// Cancelled on shutdown; every request polls under a child token.
    pub shutdown: CancellationToken,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/generate", post(handlers::generate))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}

pub async fn serve(cfg: Arc<Config>, correlator: Arc<Correlator>) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        correlator,
        shutdown: shutdown.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;

    info!(addr = %cfg.bind_addr, model = %cfg.model_label, "social story generator listening");

    let signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received; cancelling in-flight requests");
        shutdown.cancel();
    };

    axum::serve(listener, router(state))
        .with_graceful_shutdown(signal)
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
