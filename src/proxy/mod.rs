//! Proxy Module
//!
//! Origin connections, response relay, the per-connection worker and the
//! acceptor loop.
//!
//! # Request flow
//! - Parse the request line; non-GET methods get a 501 page
//! - Look the absolute URI up in the cache, then age the cache
//! - On a hit, the cached bytes are the response
//! - On a miss, connect to the origin, forward the rewritten request, relay
//!   the response and offer it to the cache

mod origin;
mod relay;
mod server;
mod worker;

use std::sync::Arc;

pub use origin::{Connect, TcpConnector};
pub use relay::{relay_response, Capture};
pub use server::run;
pub use worker::{serve_connection, Outcome};

use crate::cache::{CacheGate, CacheStore};
use crate::config::Config;

/// State shared by every worker.
pub struct ProxyState<C = TcpConnector> {
    /// The process-wide cache
    pub cache: Arc<CacheGate>,
    /// Opens origin connections on a miss
    pub connector: Arc<C>,
}

impl<C> ProxyState<C> {
    pub fn new(cache: Arc<CacheGate>, connector: C) -> Self {
        Self {
            cache,
            connector: Arc::new(connector),
        }
    }
}

impl ProxyState<TcpConnector> {
    /// Creates an empty cache sized from the configuration.
    pub fn from_config(config: &Config) -> Self {
        let store = CacheStore::new(config.cache_capacity, config.max_object_size);
        Self::new(Arc::new(CacheGate::new(store)), TcpConnector)
    }
}

impl<C> Clone for ProxyState<C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            connector: self.connector.clone(),
        }
    }
}
