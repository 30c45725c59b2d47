//! Acceptor loop.
//!
//! Spawns one independent worker per accepted connection with no upper bound,
//! and tears the cache down when the shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStats;
use crate::proxy::{serve_connection, Connect, ProxyState};

/// Accepts connections until `shutdown` resolves, then abandons in-flight
/// workers, releases the cache and returns its final statistics.
pub async fn run<C, F>(listener: TcpListener, state: ProxyState<C>, shutdown: F) -> CacheStats
where
    C: Connect,
    F: Future<Output = ()>,
{
    let mut workers = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "Accepted connection");
                    workers.spawn(handle_connection(stream, peer, state.clone()));
                }
                Err(e) => {
                    // Skip this attempt and keep serving
                    warn!(error = %e, "Accept failed");
                }
            },
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "Worker panicked");
                    }
                }
            }
        }
    }

    let abandoned = workers.len();
    workers.shutdown().await;
    info!(abandoned, "Acceptor stopped");

    state.cache.teardown().await
}

async fn handle_connection<C: Connect>(stream: TcpStream, peer: SocketAddr, state: ProxyState<C>) {
    match serve_connection(stream, &state).await {
        Ok(outcome) => debug!(peer = %peer, ?outcome, "Connection served"),
        Err(e) if e.sends_error_page() => info!(peer = %peer, error = %e, "Request rejected"),
        Err(e) => warn!(peer = %peer, error = %e, "Connection aborted"),
    }
}
