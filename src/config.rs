//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).
//!
//! | Key                      | Default   |
//! |--------------------------|-----------|
//! | `HOST`                   | `0.0.0.0` |
//! | `PORT`                   | `3000`    |
//! | `STATIC_DIR`             | `.`       |
//! | `EVENT_BUS_CAPACITY`     | `10000`   |
//! | `COMMAND_QUEUE_CAPACITY` | `1024`    |
//! | `LOG_FORMAT`             | `pretty`  |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::error::RelayError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to.
    pub listen_addr: SocketAddr,

    /// Directory served as static files at the root path.
    pub static_dir: PathBuf,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Capacity of the relay worker's command queue.
    pub command_queue_capacity: usize,

    /// Log output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set. Calls
    /// `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `HOST` or `PORT` is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, RelayError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] if `HOST` or `PORT` is set but
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host: IpAddr = lookup("HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse()
            .map_err(|e| RelayError::Config(format!("HOST: {e}")))?;

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| RelayError::Config(format!("PORT: {e}")))?,
            None => 3000,
        };

        let static_dir = lookup("STATIC_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from);
        let event_bus_capacity = parse_or(lookup("EVENT_BUS_CAPACITY"), 10_000);
        let command_queue_capacity = parse_or(lookup("COMMAND_QUEUE_CAPACITY"), 1_024);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            static_dir,
            event_bus_capacity,
            command_queue_capacity,
            log_format,
        })
    }
}

/// Parses `raw` as `T`, returning `default` on missing or invalid values.
fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}
