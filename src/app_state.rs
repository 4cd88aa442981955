//! Shared application state injected into all Axum handlers.

use crate::service::RelayHandle;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Queue into the relay worker.
    pub relay: RelayHandle,
}
