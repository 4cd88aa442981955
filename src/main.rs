//! geo-relay server entry point.
//!
//! Serves the static client page and the `/ws` relay endpoint.

use tracing_subscriber::EnvFilter;

use geo_relay::config::{LogFormat, RelayConfig};
use geo_relay::server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = RelayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting geo-relay");

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    server::serve(listener, &config).await?;

    Ok(())
}
