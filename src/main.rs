//! Relay server binary.
//!
//! Serves the line-delimited JSON relay that `TcpRelay` clients use for rooms
//! and the lobby. Configured through `TETRIS_RELAY_HOST`, `TETRIS_RELAY_PORT`
//! and `TETRIS_RELAY_DISABLED`; log level through `RUST_LOG`.

use anyhow::Result;

use versus_tetris::net::{run_relay_server, RelayServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayServerConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, "starting relay");
    run_relay_server(config, None).await
}
