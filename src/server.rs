//! Router composition and server startup.

use std::path::Path;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::RelayConfig;
use crate::domain::EventBus;
use crate::error::RelayError;
use crate::service::{Relay, spawn_relay};
use crate::ws::handler::ws_handler;

/// Builds the HTTP surface: `/ws` plus static files from `static_dir`
/// for every other path.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the relay worker and builds the application state for it.
#[must_use]
pub fn build_state(config: &RelayConfig) -> AppState {
    let relay = Relay::new(EventBus::new(config.event_bus_capacity));
    let (relay, _worker) = spawn_relay(relay, config.command_queue_capacity);
    AppState { relay }
}

/// Serves the relay on an already-bound listener until the process exits.
///
/// # Errors
///
/// Returns [`RelayError::Io`] if the server fails.
pub async fn serve(listener: TcpListener, config: &RelayConfig) -> Result<(), RelayError> {
    let app = build_router(build_state(config), &config.static_dir);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, static_dir = %config.static_dir.display(), "server listening");
    }
    axum::serve(listener, app).await?;
    Ok(())
}
