//! Origin Connector
//!
//! Resolves an origin's host and port and opens an outbound connection to the
//! first candidate address that accepts.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{lookup_host, TcpStream};
use tracing::debug;

use crate::error::{ProxyError, Result};

// == Connect ==
/// Opens connections to origin servers.
pub trait Connect: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connects to `host:port`; each call is independent, with no retry.
    fn connect(&self, host: &str, port: &str) -> impl Future<Output = Result<Self::Stream>> + Send;
}

// == Tcp Connector ==
/// Plain TCP connector using the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: &str) -> Result<TcpStream> {
        let resolve_error = |source: io::Error| ProxyError::Resolve {
            host: host.to_string(),
            port: port.to_string(),
            source,
        };

        let port_number: u16 = port.parse().map_err(|_| {
            resolve_error(io::Error::new(io::ErrorKind::InvalidInput, "port is not numeric"))
        })?;
        let candidates = lookup_host((host, port_number)).await.map_err(resolve_error)?;

        let mut last_error = None;
        for addr in candidates {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    debug!(host, %addr, "Connected to origin");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(host, %addr, error = %e, "Origin candidate refused");
                    last_error = Some(e);
                }
            }
        }

        Err(ProxyError::Connect {
            host: host.to_string(),
            port: port.to_string(),
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string()),
        })
    }
}
