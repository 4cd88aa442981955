//! # geo-relay
//!
//! Real-time location broadcast hub. Clients push their own position
//! over a WebSocket and receive everyone else's, reconstructing a shared
//! live map. State is in memory only and lives as long as the process.
//!
//! ## Architecture
//!
//! ```text
//! Clients (browser page, WebSocket)
//!     │
//!     ├── Static files (ServeDir at /)
//!     ├── WS Handler (ws/)          one task per socket
//!     │
//!     ├── RelayHandle (service/)    mpsc queue
//!     ├── Relay worker (service/)   single dispatch, owns state
//!     │
//!     ├── SessionRegistry (domain/)
//!     └── EventBus (domain/)        broadcast to every socket
//! ```

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
