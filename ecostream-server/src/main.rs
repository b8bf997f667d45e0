//! eco-stream server - REST API for users, items and file storage
//!
//! Reads configuration from the environment, connects the configured record
//! and object stores, seeds the admin account and serves HTTP until Ctrl-C or
//! SIGTERM.

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use ecostream_server::{create_router_with_state, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ecostream_server=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %format!("{:#}", e), "Server failed");
        return Err(e);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env();
    tracing::info!(
        listen_addr = %config.listen_addr,
        store = ?config.store_backend,
        objects = ?config.object_backend,
        "Starting eco-stream server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let listen_addr = config.listen_addr.clone();
    let state = AppState::from_config(config)
        .await
        .context("failed to connect backing stores")?;
    state
        .seed_admin()
        .await
        .context("failed to seed admin account")?;

    let app = create_router_with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    tracing::info!("Listening on http://{}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
