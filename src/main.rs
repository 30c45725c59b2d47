//! Cache Proxy - A concurrent HTTP/1.0 forward proxy
//!
//! Serves GET requests for absolute `http://` URIs, answering repeats from an
//! in-memory cache.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_proxy::{run, Cli, Config, ProxyState};

/// Main entry point for the proxy.
///
/// # Startup Sequence
/// 1. Parse the listening port from the command line
/// 2. Initialize tracing subscriber for logging
/// 3. Load cache sizing from environment variables
/// 4. Create the shared cache
/// 5. Accept connections until SIGINT/SIGTERM, then release the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache proxy");

    let config = Config::from_env(&cli);
    info!(
        "Configuration loaded: port={}, cache_capacity={}, max_object_size={}",
        config.listen_port, config.cache_capacity, config.max_object_size
    );

    let state = ProxyState::from_config(&config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {}", addr))?;
    info!("Proxy listening on {}", addr);

    let stats = run(listener, state, shutdown_signal()).await;

    info!(
        stats = %serde_json::to_string(&stats)?,
        hit_rate = stats.hit_rate(),
        "Proxy shutdown complete"
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, releasing cache...");
        }
        _ = terminate => {
            info!("Received SIGTERM, releasing cache...");
        }
    }
}
