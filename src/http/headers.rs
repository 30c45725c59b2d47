//! Header rewriting for the forwarded request.
//!
//! `Host` passes through (or is synthesized), `User-Agent`, `Connection` and
//! `Proxy-Connection` are forced to fixed values, everything else is copied
//! verbatim in order.

use tokio::io::AsyncRead;

use crate::error::{ProxyError, Result};
use crate::http::LineReader;

pub const USER_AGENT_HDR: &str =
    "User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n";
pub const CONNECTION_HDR: &str = "Connection: close\r\n";
pub const PROXY_CONNECTION_HDR: &str = "Proxy-Connection: close\r\n";

/// Headers the proxy treats specially, matched as a case-insensitive prefix
/// of the header's first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Special {
    Host,
    UserAgent,
    Connection,
    ProxyConnection,
}

impl Special {
    fn classify(name: &[u8]) -> Option<Self> {
        const TABLE: [(&[u8], Special); 4] = [
            (b"Host", Special::Host),
            (b"User-Agent", Special::UserAgent),
            (b"Connection", Special::Connection),
            (b"Proxy-Connection", Special::ProxyConnection),
        ];

        TABLE.iter().find_map(|(prefix, kind)| {
            let matches = name.len() >= prefix.len()
                && name[..prefix.len()].eq_ignore_ascii_case(prefix);
            matches.then_some(*kind)
        })
    }
}

// == Header Block ==
/// Accumulates the rewritten header block line by line.
#[derive(Debug, Default)]
pub struct HeaderBlock {
    out: Vec<u8>,
    has_host: bool,
    has_user_agent: bool,
    has_connection: bool,
    has_proxy_connection: bool,
}

impl HeaderBlock {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one client header line (terminator included).
    ///
    /// The line must split into a name token and a non-empty value.
    pub fn push_line(&mut self, line: &[u8]) -> Result<()> {
        let mut tokens = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|token| !token.is_empty());
        let (Some(name), Some(_value)) = (tokens.next(), tokens.next()) else {
            return Err(ProxyError::MalformedHeader(
                String::from_utf8_lossy(line).trim_end().to_string(),
            ));
        };

        match Special::classify(name) {
            Some(Special::Host) => {
                self.has_host = true;
                self.out.extend_from_slice(line);
            }
            Some(Special::UserAgent) => {
                if !std::mem::replace(&mut self.has_user_agent, true) {
                    self.out.extend_from_slice(USER_AGENT_HDR.as_bytes());
                }
            }
            Some(Special::Connection) => {
                if !std::mem::replace(&mut self.has_connection, true) {
                    self.out.extend_from_slice(CONNECTION_HDR.as_bytes());
                }
            }
            Some(Special::ProxyConnection) => {
                if !std::mem::replace(&mut self.has_proxy_connection, true) {
                    self.out.extend_from_slice(PROXY_CONNECTION_HDR.as_bytes());
                }
            }
            None => self.out.extend_from_slice(line),
        }
        Ok(())
    }

    /// Appends any missing required headers and the blank terminator.
    pub fn finish(mut self, host: &str) -> Vec<u8> {
        if !self.has_host {
            self.out.extend_from_slice(format!("Host: {}\r\n", host).as_bytes());
        }
        if !self.has_user_agent {
            self.out.extend_from_slice(USER_AGENT_HDR.as_bytes());
        }
        if !self.has_connection {
            self.out.extend_from_slice(CONNECTION_HDR.as_bytes());
        }
        if !self.has_proxy_connection {
            self.out.extend_from_slice(PROXY_CONNECTION_HDR.as_bytes());
        }
        self.out.extend_from_slice(b"\r\n");
        self.out
    }
}

fn is_blank(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

// == Rewrite Headers ==
/// Reads client headers up to the blank line and returns the rewritten block.
///
/// End of stream before the blank line is a malformed header.
pub async fn rewrite_headers<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
    host: &str,
) -> Result<Vec<u8>> {
    let mut block = HeaderBlock::new();
    let mut line = Vec::new();

    loop {
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(ProxyError::ClientRead)?;
        if n == 0 {
            return Err(ProxyError::MalformedHeader(
                "connection closed before end of headers".to_string(),
            ));
        }
        if is_blank(&line) {
            break;
        }
        block.push_line(&line)?;
    }

    Ok(block.finish(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn rewrite(lines: &[&str], host: &str) -> Result<String> {
        let mut block = HeaderBlock::new();
        for line in lines {
            block.push_line(line.as_bytes())?;
        }
        Ok(String::from_utf8(block.finish(host)).unwrap())
    }

    fn count_lines(block: &str, line: &str) -> usize {
        block.split("\r\n").filter(|l| *l == line).count()
    }

    #[test]
    fn test_no_headers_synthesizes_all() {
        let out = rewrite(&[], "example.com").unwrap();
        assert_eq!(
            out,
            format!(
                "Host: example.com\r\n{}{}{}\r\n",
                USER_AGENT_HDR, CONNECTION_HDR, PROXY_CONNECTION_HDR
            )
        );
    }

    #[test]
    fn test_client_host_copied_verbatim() {
        let out = rewrite(&["host: other.org:81\r\n"], "example.com").unwrap();
        assert!(out.starts_with("host: other.org:81\r\n"));
        assert!(!out.contains("Host: example.com"));
    }

    #[test]
    fn test_forced_headers_replace_client_values() {
        let out = rewrite(
            &[
                "User-Agent: curl/8.0\r\n",
                "Connection: keep-alive\r\n",
                "proxy-connection: keep-alive\r\n",
                "Accept: */*\r\n",
            ],
            "example.com",
        )
        .unwrap();

        assert!(!out.contains("curl/8.0"));
        assert!(!out.contains("keep-alive"));
        assert_eq!(count_lines(&out, "Connection: close"), 1);
        assert_eq!(count_lines(&out, "Proxy-Connection: close"), 1);
        assert_eq!(count_lines(&out, USER_AGENT_HDR.trim_end()), 1);
        assert!(out.contains("Accept: */*\r\n"));
    }

    #[test]
    fn test_forced_headers_keep_position() {
        let out = rewrite(
            &["Accept: */*\r\n", "Connection: keep-alive\r\n", "X-Trace: 1\r\n"],
            "h",
        )
        .unwrap();
        assert!(out.starts_with("Accept: */*\r\nConnection: close\r\nX-Trace: 1\r\n"));
    }

    #[test]
    fn test_duplicate_forced_headers_emitted_once() {
        let out = rewrite(
            &[
                "Connection: keep-alive\r\n",
                "Connection: upgrade\r\n",
                "User-Agent: a\r\n",
                "User-Agent: b\r\n",
            ],
            "h",
        )
        .unwrap();
        assert_eq!(count_lines(&out, "Proxy-Connection: close"), 1);
        assert_eq!(count_lines(&out, "Connection: close"), 1);
        assert_eq!(out.matches("User-Agent:").count(), 1);
    }

    #[test]
    fn test_other_headers_preserved_in_order() {
        let out = rewrite(&["B: 2\r\n", "A: 1\r\n", "C: 3\r\n"], "h").unwrap();
        assert!(out.starts_with("B: 2\r\nA: 1\r\nC: 3\r\nHost: h\r\n"));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(matches!(rewrite(&["NoValue\r\n"], "h"), Err(ProxyError::MalformedHeader(_))));
        assert!(matches!(rewrite(&["Accept:\r\n"], "h"), Err(ProxyError::MalformedHeader(_))));
    }

    #[test]
    fn test_classify_prefix_match() {
        assert_eq!(Special::classify(b"Host:"), Some(Special::Host));
        assert_eq!(Special::classify(b"HOST:"), Some(Special::Host));
        assert_eq!(Special::classify(b"User-Agent:"), Some(Special::UserAgent));
        assert_eq!(Special::classify(b"Proxy-Connection:"), Some(Special::ProxyConnection));
        assert_eq!(Special::classify(b"Accept:"), None);
        assert_eq!(Special::classify(b"Hos:"), None);
    }

    #[tokio::test]
    async fn test_rewrite_headers_from_stream() {
        let mock = Builder::new()
            .read(b"Host: example.com\r\nUser-Agent: curl\r\n\r\n")
            .build();
        let mut reader = LineReader::new(mock);

        let out = rewrite_headers(&mut reader, "example.com").await.unwrap();
        assert_eq!(
            out,
            format!(
                "Host: example.com\r\n{}{}{}\r\n",
                USER_AGENT_HDR, CONNECTION_HDR, PROXY_CONNECTION_HDR
            )
            .into_bytes()
        );
    }

    #[tokio::test]
    async fn test_rewrite_headers_accepts_bare_newline() {
        let mock = Builder::new().read(b"Accept: */*\n\n").build();
        let mut reader = LineReader::new(mock);

        let out = rewrite_headers(&mut reader, "h").await.unwrap();
        assert!(out.starts_with(b"Accept: */*\n"));
        assert!(out.ends_with(b"\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_rewrite_headers_eof_is_malformed() {
        let mock = Builder::new().read(b"Accept: */*\r\n").build();
        let mut reader = LineReader::new(mock);

        assert!(matches!(
            rewrite_headers(&mut reader, "h").await,
            Err(ProxyError::MalformedHeader(_))
        ));
    }
}
