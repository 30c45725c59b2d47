//! Response Relay & Capture
//!
//! Streams the origin response to the client line by line and mirrors it into
//! a bounded buffer for the cache.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::http::LineReader;

// == Capture ==
/// Bytes relayed so far and the mirrored prefix.
#[derive(Debug)]
pub struct Capture {
    /// Every byte relayed to the client
    pub size: usize,
    /// Mirrored bytes; complete only while `size < max_object_size`
    pub payload: Vec<u8>,
    max_object_size: usize,
}

impl Capture {
    /// Empty capture bounded by `max_object_size`.
    pub fn new(max_object_size: usize) -> Self {
        Self {
            size: 0,
            payload: Vec::new(),
            max_object_size,
        }
    }

    /// Accounts for one relayed line, mirroring it while the total stays
    /// under the object limit. Once a line would cross it the buffer stops
    /// growing.
    pub fn record(&mut self, line: &[u8]) {
        if self.size + line.len() < self.max_object_size {
            self.payload.extend_from_slice(line);
        }
        self.size += line.len();
    }
}

// == Relay Response ==
/// Relays the origin response until end of stream.
///
/// A failure on either side aborts; bytes already sent stay sent.
pub async fn relay_response<R, W>(
    origin: &mut LineReader<R>,
    client: &mut W,
    max_object_size: usize,
) -> Result<Capture>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut capture = Capture::new(max_object_size);
    let mut line = Vec::new();

    loop {
        let n = origin
            .read_line(&mut line)
            .await
            .map_err(ProxyError::OriginRead)?;
        if n == 0 {
            break;
        }
        client
            .write_all(&line)
            .await
            .map_err(ProxyError::ClientWrite)?;
        capture.record(&line);
    }
    client.flush().await.map_err(ProxyError::ClientWrite)?;

    debug!(
        size = capture.size,
        captured = capture.payload.len(),
        "Origin response relayed"
    );
    Ok(capture)
}
