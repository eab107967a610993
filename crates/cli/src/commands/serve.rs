//! Serve command - run the HTTP trigger API

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::args::ServeArgs;
use crate::config::read_secret;
use crate::context::AppContext;
use crate::server::{self, AppState};

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let context = AppContext::load(config_path.as_deref()).await?;
    let server_config = &context.config.server;

    let token = read_secret(&server_config.token_env, "the API bearer token")?;
    let bind = args.bind.unwrap_or_else(|| server_config.bind.clone());
    let max_upload_bytes = server_config.max_upload_mb * 1024 * 1024;

    let state = AppState::new(
        context.pipeline.clone(),
        context.reconciler.clone(),
        token,
    );
    let app = server::router(state, max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    tracing::info!(bind = %bind, "Serving HTTP API");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("HTTP server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}
