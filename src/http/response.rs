//! Error responses sent to clients.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{ProxyError, Result};

/// Builds a complete HTTP/1.0 error response with an HTML body.
pub fn error_page(cause: &str, code: u16, short_msg: &str, long_msg: &str) -> Vec<u8> {
    let body = format!(
        "<html><title>Proxy Error</title><body bgcolor=ffffff>\r\n\
         {code}: {short_msg}\r\n\
         <p>{long_msg}: {cause}\r\n\
         <hr><em>cache_proxy</em>\r\n"
    );

    let mut page = format!(
        "HTTP/1.0 {code} {short_msg}\r\n\
         Content-type: text/html\r\n\
         Content-length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    page.extend_from_slice(body.as_bytes());
    page
}

/// Writes the 501 page for an unsupported method.
pub async fn send_not_implemented<W: AsyncWrite + Unpin>(client: &mut W, method: &str) -> Result<()> {
    let page = error_page(
        method,
        501,
        "Not Implemented",
        "proxy does not implement this method",
    );
    client.write_all(&page).await.map_err(ProxyError::ClientWrite)?;
    client.flush().await.map_err(ProxyError::ClientWrite)
}
