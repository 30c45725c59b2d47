//! Connection Worker
//!
//! Runs one request/response transaction for one accepted client connection.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{info, warn};

use crate::cache::Admission;
use crate::error::{ProxyError, Result};
use crate::http::{rewrite_headers, send_not_implemented, LineReader, RequestLine, RequestUri};
use crate::proxy::{relay_response, Connect, ProxyState};

/// How a successfully served connection was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache
    Hit { bytes: usize },
    /// Fetched from the origin, then offered to the cache
    Miss { bytes: usize, admission: Admission },
}

// == Serve Connection ==
/// Serves a single client connection to completion.
///
/// An unsupported method is answered with a 501 page; every other failure
/// just ends the transaction. The connection closes when this returns.
pub async fn serve_connection<S, C>(stream: S, state: &ProxyState<C>) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Connect,
{
    let (read_half, mut client) = tokio::io::split(stream);
    let mut reader = LineReader::new(read_half);

    let result = transact(&mut reader, &mut client, state).await;

    if let Err(ProxyError::NotImplemented(method)) = &result {
        send_not_implemented(&mut client, method).await?;
    }
    // The peer may already be gone; nothing left to report
    let _ = client.shutdown().await;

    result
}

async fn transact<S, C>(
    reader: &mut LineReader<ReadHalf<S>>,
    client: &mut WriteHalf<S>,
    state: &ProxyState<C>,
) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Connect,
{
    let request = RequestLine::read(reader).await?;
    if !request.is_get() {
        return Err(ProxyError::NotImplemented(request.method));
    }
    info!(uri = %request.target, "Received request");

    let cache = &state.cache;

    // Cached bytes are written while the reader side is held
    let (hit, delivered) = {
        let store = cache.read().await;
        match store.lookup(&request.target) {
            Some(entry) => {
                let written = client.write_all(entry.payload()).await;
                (Some(entry.id()), Some(written.map(|()| entry.size())))
            }
            None => (None, None),
        }
    };
    cache.age(hit).await;

    if let Some(written) = delivered {
        let bytes = written.map_err(|e| {
            warn!(uri = %request.target, error = %e, "Failed to write cached object to client");
            ProxyError::ClientWrite(e)
        })?;
        info!(uri = %request.target, bytes, "Cache hit");
        return Ok(Outcome::Hit { bytes });
    }
    info!(uri = %request.target, "Cache miss");

    let uri = RequestUri::parse(&request.target)?;
    let origin = state.connector.connect(&uri.host, &uri.port).await?;
    let (origin_read, mut origin_write) = tokio::io::split(origin);

    let headers = rewrite_headers(reader, &uri.host).await?;
    let mut forward = format!("GET {} HTTP/1.0\r\n", uri.path).into_bytes();
    forward.extend_from_slice(&headers);
    origin_write
        .write_all(&forward)
        .await
        .map_err(ProxyError::OriginWrite)?;
    origin_write.flush().await.map_err(ProxyError::OriginWrite)?;

    let mut origin_reader = LineReader::new(origin_read);
    let capture = relay_response(&mut origin_reader, client, cache.max_object_size()).await?;

    let bytes = capture.size;
    let admission = cache.admit(request.target, capture.size, capture.payload).await;
    Ok(Outcome::Miss { bytes, admission })
}
