//! HTTP/1.1 connection handling.
//!
//! One request per connection: parse, log, answer with the requested file,
//! close. Plaintext clients on a secure-only port get a redirect instead.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::LimitsConfig;
use crate::error::ConnectionError;
use crate::files::{content_type, StaticFiles};
use crate::http1::parser::{parse_request, MessageReader};
use crate::http1::request::Http1Request;
use crate::http1::response::{ok_head, redirect_head, write_head};
use crate::observability::metrics;

/// Everything an HTTP/1.1 connection needs, shared read-only across tasks.
#[derive(Debug, Clone)]
pub struct Http1Handler {
    files: StaticFiles,
    limits: LimitsConfig,
}

impl Http1Handler {
    pub fn new(files: StaticFiles, limits: LimitsConfig) -> Self {
        Self { files, limits }
    }

    /// Read one request from `channel` and answer it.
    pub async fn serve<S>(&self, channel: &mut S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = self.read_request(channel).await?;
        request.display();
        metrics::record_request(&request.method);

        self.respond(&request, channel).await
    }

    /// Answer a plaintext client with a permanent redirect to `https://host:port`.
    ///
    /// The original target is kept when the request line can be parsed.
    pub async fn redirect<S>(&self, channel: &mut S, host: &str, port: u16) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let target = match self.read_request(channel).await {
            Ok(request) => request.target,
            Err(e) => {
                tracing::debug!(error = %e, "Redirecting without a parsed target");
                "/".to_string()
            }
        };

        tracing::info!(host, port, target = %target, "Redirecting to https");
        write_head(channel, &redirect_head(host, port, &target))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to write the permanent redirection header"))
    }

    async fn read_request<S>(&self, channel: &mut S) -> Result<Http1Request, ConnectionError>
    where
        S: AsyncRead + Unpin,
    {
        let mut reader = MessageReader::new(&mut *channel, self.limits.max_line_bytes);
        Ok(parse_request(&mut reader, &self.limits).await?)
    }

    async fn respond<S>(&self, request: &Http1Request, channel: &mut S) -> Result<(), ConnectionError>
    where
        S: AsyncWrite + Unpin,
    {
        let file = self.files.open(&request.target).await?;
        let content_type = content_type(&request.target);

        write_head(channel, &ok_head(&content_type)).await?;
        let sent = self.files.send_file(file, channel).await?;

        tracing::info!(
            status = 200,
            content_type = %content_type,
            bytes = sent,
            "| HTTP/1.1 200 OK"
        );
        Ok(())
    }
}
