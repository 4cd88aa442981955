//! WebSocket layer: wire messages, connection loop, upgrade handler.
//!
//! The endpoint at `/ws` carries the `register` / `position` /
//! `stopTracking` events in and `position` / `disconnectUser` out.

pub mod client_view;
pub mod connection;
pub mod handler;
pub mod messages;
