//! runpod-gateway binary: loads configuration, then serves the gateway API.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info};

use runpod_gateway::config::{Cli, Config};
use runpod_gateway::server::gateway_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "runpod_gateway=debug,tower_http=debug"
    } else {
        "runpod_gateway=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("runpod-gateway v{}", env!("CARGO_PKG_VERSION"));

    // Seed the environment from a dotenv file.
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
            info!(path = %path.display(), "Loaded environment file");
        }
        None => match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "Loaded environment file"),
            Err(e) => debug!("No .env file loaded: {e}"),
        },
    }

    // Load configuration.
    let mut config = Config::from_env()?;
    config.apply_cli(&cli);
    config.validate()?;

    info!(
        api_base = %config.backends.api_base,
        airoboros_endpoint = %config.backends.airoboros.endpoint_id,
        llama_endpoint = %config.backends.llama.endpoint_id,
        poll_interval_ms = config.poll.initial_interval_ms,
        poll_max_interval_ms = config.poll.max_interval_ms,
        max_wait_secs = config.poll.max_wait_secs,
        "Configuration loaded"
    );

    // Build application state and router.
    let state = Arc::new(AppState::new(&config)?);
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
