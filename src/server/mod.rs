// src/server/mod.rs
//! Parcel HTTP server
//!
//! Thin gateway over the lifecycle engine and the token authority:
//! - Routes requests to engine/authority operations
//! - Gates every non-public route on a valid token
//! - Renders domain errors as RFC 7807 problem documents

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{PUBLIC_PATHS, PresentedToken, require_token};
pub use error::{ApiError, ApiResult, Problem};
pub use routes::create_router;

use crate::auth::TokenAuthority;
use crate::db::Database;
use crate::fetch::{Fetcher, NixFetcher};
use crate::lifecycle::{EngineConfig, PackageEngine};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Background download tuning
    pub engine: EngineConfig,
    /// External fetch commands
    pub fetcher: NixFetcher,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            db_path: PathBuf::from("./parcel.db"),
            engine: EngineConfig::default(),
            fetcher: NixFetcher::default(),
        }
    }
}

/// State shared by every handler
pub struct AppState {
    pub engine: PackageEngine,
    pub tokens: TokenAuthority,
}

impl AppState {
    pub fn new(db: Database, fetcher: Arc<dyn Fetcher>, engine: EngineConfig) -> Self {
        Self {
            engine: PackageEngine::new(db.clone(), fetcher, engine),
            tokens: TokenAuthority::new(db),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Run the server until Ctrl-C, then drain running downloads
pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing::info!("Starting Parcel server on {}", config.bind_addr);
    tracing::info!("Database: {:?}", config.db_path);
    tracing::info!(
        "Fetch timeout: {}s, max concurrent fetches: {}",
        config.engine.fetch_timeout.as_secs(),
        config.engine.max_concurrent
    );

    let db = Database::init(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    let state = Arc::new(AppState::new(
        db,
        Arc::new(config.fetcher.clone()),
        config.engine.clone(),
    ));

    if state.tokens.is_bootstrap().await? {
        tracing::warn!("No API tokens exist; all requests are accepted until one is issued");
    }

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Parcel is ready to serve");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    state.engine.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
