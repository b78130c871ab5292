//! Response heads written by the HTTP/1.1 handler.
//!
//! Each head is assembled in one buffer and written with a single call.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::ConnectionError;

const CRLF: &str = "\r\n";

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

/// `200 OK` head announcing `content_type`.
pub fn ok_head(content_type: &str) -> String {
    format!("HTTP/1.1 200 OK{CRLF}{HEADER_CONTENT_TYPE}: {content_type}{CRLF}{CRLF}")
}

/// `301` head pointing at the secure endpoint for the same target.
pub fn redirect_head(host: &str, port: u16, target: &str) -> String {
    format!("HTTP/1.1 301 Moved Permanently{CRLF}Location: https://{host}:{port}{target}{CRLF}{CRLF}")
}

/// Write a complete head and flush it.
pub async fn write_head<W>(writer: &mut W, head: &str) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(head.as_bytes())
        .await
        .map_err(ConnectionError::from_write)?;
    writer.flush().await.map_err(ConnectionError::from_write)
}
