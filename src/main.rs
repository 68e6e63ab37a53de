/// Weather MCP Server Entry Point
///
/// Loads configuration from the environment, builds the tool table and serves it
/// over the configured transport. Logs go to stderr; stdout belongs to the STDIO
/// transport. Set `RUST_LOG` to adjust verbosity (default: "info").
///
/// See `core::config` for the environment variables.

mod core;
mod tools;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::config::{Config, TransportMode};
use crate::core::error::ServerError;
use crate::core::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let registry = tools::build_registry(&config)?;
    let state = AppState::new(&config, registry);

    info!(transport = %config.transport, "configuration loaded");

    match config.transport {
        TransportMode::Stdio => server::run_server_stdio(state).await?,
        TransportMode::Http => {
            server::run_server_http(state, &config.host, config.port, config.workers).await?
        }
        TransportMode::Both => {
            // STDIO runs in the background; the process lives as long as HTTP does.
            let stdio_state = state.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(stdio_state).await {
                    error!(error = %e, "STDIO server error");
                }
            });

            let http_result =
                server::run_server_http(state, &config.host, config.port, config.workers).await;
            stdio_handle.abort();
            http_result?
        }
    }

    Ok(())
}
