//! Switchboard Server — HTTP API over the Switchboard repositories.

pub mod api;
pub mod config;

use std::sync::Arc;

use switchboard_db::{DbError, DbManager};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::state::AppState;
use crate::config::{ConfigError, ServerConfig};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connect to the database, bind the listener and serve until a
/// shutdown signal arrives.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let db = DbManager::connect(&config.db).await?;
    let state = Arc::new(AppState::new(db, config.authz));
    let router = api::build_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
