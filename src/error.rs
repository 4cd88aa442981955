//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay. None of its
//! variants are ever reported to a client: a rejected inbound frame is
//! dropped and logged, and the only observable effect is the absence of
//! a broadcast.

/// Server-side error enum.
///
/// | Variant      | Raised by                          | Client-visible |
/// |--------------|------------------------------------|----------------|
/// | `MissingId`  | inbound payload validation         | no             |
/// | `Decode`     | inbound frame decoding             | no             |
/// | `Encode`     | outbound frame encoding            | no             |
/// | `WorkerGone` | [`crate::service::RelayHandle`]    | no             |
/// | `Config`     | [`crate::config::RelayConfig`]     | startup only   |
/// | `Io`         | listener bind / serve              | startup only   |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Required `id` field was absent, `null`, or empty.
    #[error("{event}: missing visitor id")]
    MissingId {
        /// Inbound event name the payload belonged to.
        event: &'static str,
    },

    /// Inbound frame was not a recognized JSON event.
    #[error("malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// Outbound event could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The relay worker has stopped and no longer accepts commands.
    #[error("relay worker is not running")]
    WorkerGone,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O failure while binding or serving.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Returns `true` for errors caused by client input, which are
    /// dropped silently rather than tearing down the connection.
    #[must_use]
    pub const fn is_client_fault(&self) -> bool {
        matches!(self, Self::MissingId { .. } | Self::Decode(_))
    }
}
