//! Error types for the proxy
//!
//! Provides unified error handling using thiserror.

use std::io;

use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for a single proxied transaction.
///
/// Every variant ends the worker that produced it; none of them is fatal to
/// the process.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Request line missing, not three tokens, or a token over the line ceiling
    #[error("Bad request line: {0}")]
    BadRequestLine(String),

    /// Method other than GET
    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    /// Request target is not an absolute `http://host[:port]/path` URI
    #[error("Invalid request URI: {0}")]
    InvalidUri(String),

    /// Header line that does not split into a name and a value
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    /// Name resolution for the origin failed
    #[error("Failed to resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: String,
        #[source]
        source: io::Error,
    },

    /// Every resolved candidate refused the connection
    #[error("Failed to connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: String,
        reason: String,
    },

    /// Reading from the client failed
    #[error("Client read error: {0}")]
    ClientRead(#[source] io::Error),

    /// Writing to the client failed
    #[error("Client write error: {0}")]
    ClientWrite(#[source] io::Error),

    /// Reading from the origin failed
    #[error("Origin read error: {0}")]
    OriginRead(#[source] io::Error),

    /// Writing to the origin failed
    #[error("Origin write error: {0}")]
    OriginWrite(#[source] io::Error),
}

impl ProxyError {
    /// Whether the client receives a formatted error page for this failure.
    ///
    /// Only an unsupported method is answered; every other failure closes the
    /// connection silently.
    pub fn sends_error_page(&self) -> bool {
        matches!(self, ProxyError::NotImplemented(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
