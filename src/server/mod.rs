//! HTTP API server.
//!
//! Exposes call credentials and the agent bridge over REST.

mod handlers;
mod sessions;

pub use sessions::{Reservation, SessionRegistry};

use crate::config::{Credentials, Settings};
use crate::error::Result;
use crate::video::{StreamVideoClient, VideoPlatform};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state, built once at startup.
pub struct AppState {
    pub platform: Arc<dyn VideoPlatform>,
    pub credentials: Credentials,
    pub settings: Settings,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(platform: Arc<dyn VideoPlatform>, credentials: Credentials, settings: Settings) -> Self {
        Self {
            platform,
            credentials,
            settings,
            sessions: SessionRegistry::new(),
        }
    }
}

/// Validate credentials and build the application state.
///
/// Must succeed before any listener is bound.
pub fn prepare<F>(settings: Settings, lookup: F) -> Result<Arc<AppState>>
where
    F: Fn(&str) -> Option<String>,
{
    let credentials = Credentials::from_lookup(lookup)?;
    settings.stream.validate()?;
    let platform = Arc::new(StreamVideoClient::new(&credentials, &settings.stream)?);
    Ok(Arc::new(AppState::new(platform, credentials, settings)))
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/credentials", get(handlers::credentials))
        .route("/{id}/connect", post(handlers::connect))
        .route("/{id}/disconnect", post(handlers::disconnect))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `listener` until Ctrl+C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server started on {}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C; shutdown only by termination");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
