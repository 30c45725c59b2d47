//! Configuration Module
//!
//! Handles the command line and the environment overrides for cache sizing.

use std::env;

use clap::Parser;

use crate::cache::{MAX_CACHE_SIZE, MAX_OBJECT_SIZE};

/// Command line arguments.
///
/// The listening port is the only (and required) argument; clap prints usage
/// and exits non-zero on anything else.
#[derive(Debug, Parser)]
#[command(name = "cache_proxy")]
#[command(about = "Caching HTTP/1.0 forward proxy", long_about = None)]
pub struct Cli {
    /// Port to listen on
    pub port: u16,
}

/// Proxy configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the acceptor listens on
    pub listen_port: u16,
    /// Total bytes the cache may hold
    pub cache_capacity: usize,
    /// Responses of this size or larger are never cached
    pub max_object_size: usize,
}

impl Config {
    /// Builds a Config from the parsed command line plus environment overrides.
    ///
    /// # Environment Variables
    /// - `PROXY_CACHE_CAPACITY` - Cache capacity in bytes (default: 1049000)
    /// - `PROXY_MAX_OBJECT_SIZE` - Largest cacheable response, exclusive (default: 102400)
    pub fn from_env(cli: &Cli) -> Self {
        Self {
            listen_port: cli.port,
            cache_capacity: env::var("PROXY_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CACHE_SIZE),
            max_object_size: env::var("PROXY_MAX_OBJECT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_OBJECT_SIZE),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: 15213,
            cache_capacity: MAX_CACHE_SIZE,
            max_object_size: MAX_OBJECT_SIZE,
        }
    }
}
