//! Cache Proxy - A concurrent HTTP/1.0 forward proxy
//!
//! Relays GET requests to origin servers and keeps eligible responses in a
//! size-bounded in-memory cache with approximate LRU eviction.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod proxy;

pub use cache::{CacheGate, CacheStore};
pub use config::{Cli, Config};
pub use error::{ProxyError, Result};
pub use proxy::{run, ProxyState, TcpConnector};
