//! HTTP/1.0 wire handling
//!
//! Line framing, request parsing, header rewriting and error pages. Only the
//! subset a forward GET proxy needs; no persistent connections or chunking.

mod headers;
mod line;
mod request;
mod response;

pub use headers::{
    rewrite_headers, HeaderBlock, CONNECTION_HDR, PROXY_CONNECTION_HDR, USER_AGENT_HDR,
};
pub use line::LineReader;
pub use request::{RequestLine, RequestUri};
pub use response::{error_page, send_not_implemented};

/// Line-length ceiling; a single line read yields at most `MAX_LINE - 1` bytes
pub const MAX_LINE: usize = 8192;
