//! Bounded line reader.
//!
//! Reads `\n`-terminated lines but never returns more than `MAX_LINE - 1`
//! bytes per call; a longer line arrives as consecutive chunks.

use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader};

use crate::http::MAX_LINE;

/// Buffered reader yielding one line (or line-sized chunk) at a time.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
    limit: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Reader with the default `MAX_LINE` limit.
    pub fn new(inner: R) -> Self {
        Self::with_line_limit(inner, MAX_LINE)
    }

    /// Reader whose chunks hold at most `max_line - 1` bytes.
    pub fn with_line_limit(inner: R, max_line: usize) -> Self {
        Self {
            inner: BufReader::with_capacity(max_line.max(2), inner),
            limit: max_line.saturating_sub(1).max(1),
        }
    }

    /// Replaces `buf` with the next line, terminator included.
    ///
    /// Returns the number of bytes read; 0 means end of stream.
    pub async fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();

        while buf.len() < self.limit {
            let (used, complete) = {
                let available = self.inner.fill_buf().await?;
                if available.is_empty() {
                    break;
                }
                let room = self.limit - buf.len();
                let window = &available[..available.len().min(room)];
                match window.iter().position(|&b| b == b'\n') {
                    Some(pos) => {
                        buf.extend_from_slice(&window[..=pos]);
                        (pos + 1, true)
                    }
                    None => {
                        buf.extend_from_slice(window);
                        (window.len(), false)
                    }
                }
            };
            self.inner.consume(used);
            if complete {
                break;
            }
        }

        Ok(buf.len())
    }
}
