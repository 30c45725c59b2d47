//! Request line and absolute-URI parsing.

use tokio::io::AsyncRead;
use tracing::debug;

use crate::error::{ProxyError, Result};
use crate::http::{LineReader, MAX_LINE};

const SCHEME: &str = "http://";
const DEFAULT_PORT: &str = "80";

// == Request Line ==
/// `METHOD SP absolute-URI SP VERSION`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    /// Absolute request URI; also the cache key
    pub target: String,
    pub version: String,
}

impl RequestLine {
    /// Reads and parses the first line of a client request.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut LineReader<R>) -> Result<Self> {
        let mut buf = Vec::new();
        let n = reader
            .read_line(&mut buf)
            .await
            .map_err(ProxyError::ClientRead)?;
        if n == 0 {
            return Err(ProxyError::BadRequestLine(
                "connection closed before request line".to_string(),
            ));
        }
        Self::parse(&buf)
    }

    /// Parses exactly three whitespace-separated tokens.
    pub fn parse(line: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(line)
            .map_err(|_| ProxyError::BadRequestLine(String::from_utf8_lossy(line).into_owned()))?;

        let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
        let [method, target, version] = tokens.as_slice() else {
            return Err(ProxyError::BadRequestLine(text.trim_end().to_string()));
        };

        if tokens.iter().any(|token| token.len() >= MAX_LINE) {
            return Err(ProxyError::BadRequestLine("token too long".to_string()));
        }

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
        })
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

// == Request URI ==
/// Parts of `http://<host>[:<port>]/<rest>` needed to reach the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUri {
    pub host: String,
    pub port: String,
    /// Path and query, leading `/` included; forwarded as the request target
    pub path: String,
}

impl RequestUri {
    /// Splits an absolute URI into host, port and origin-form target.
    ///
    /// The first `/` after the scheme separates authority from path; a `:`
    /// only names a port when it appears before that `/`.
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = || ProxyError::InvalidUri(uri.to_string());

        let scheme = uri.get(..SCHEME.len()).ok_or_else(invalid)?;
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(invalid());
        }
        let rest = &uri[SCHEME.len()..];

        let boundary = rest.find('/').ok_or_else(invalid)?;
        let (authority, path) = rest.split_at(boundary);

        let (host, port) = match authority.find(':') {
            Some(colon) => (&authority[..colon], &authority[colon + 1..]),
            None => (authority, DEFAULT_PORT),
        };

        if host.len() >= MAX_LINE || port.len() >= MAX_LINE {
            return Err(invalid());
        }

        debug!(host, port, path, "Parsed request URI");
        Ok(Self {
            host: host.to_string(),
            port: port.to_string(),
            path: path.to_string(),
        })
    }
}
