//! HTTP/1.1 request parsing.
//!
//! Three phases, strictly in order and without backtracking:
//!
//! 1. Request line: one `\n`-terminated line, trimmed, split on single
//!    spaces into exactly three tokens.
//! 2. Headers: `Name: Value` lines split at the first `:` until an empty line.
//! 3. Body: `Content-Length` bytes if the header parses, otherwise whatever is
//!    already buffered. The body is peeked, not consumed.
//!
//! The target is not normalised or percent-decoded; only `/` is rewritten.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::LimitsConfig;
use crate::error::{ParseError, WireError};
use crate::http1::request::{resolve_target, Headers, Http1Request};

const READ_CHUNK: usize = 4096;

pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";

/// Buffered reader supporting line reads and non-consuming peeks.
#[derive(Debug)]
pub struct MessageReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
    max_line: usize,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R, max_line: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(READ_CHUNK),
            pos: 0,
            max_line,
        }
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read up to and including the next `\n`.
    ///
    /// End of stream before a terminator is a short read, even if some bytes
    /// arrived.
    pub async fn read_line(&mut self) -> Result<String, ParseError> {
        let mut scanned = 0;
        loop {
            let pending = &self.buf[self.pos..];
            if let Some(i) = pending[scanned..].iter().position(|&b| b == b'\n') {
                let end = self.pos + scanned + i + 1;
                let line = String::from_utf8_lossy(&self.buf[self.pos..end]).into_owned();
                self.pos = end;
                return Ok(line);
            }
            scanned = pending.len();
            if scanned >= self.max_line {
                return Err(ParseError::LineTooLong {
                    limit: self.max_line,
                });
            }
            if self.fill().await? == 0 {
                return Err(WireError::ShortRead {
                    expected: scanned + 1,
                    received: scanned,
                }
                .into());
            }
        }
    }

    /// Return the next `n` bytes without consuming them, reading more if needed.
    pub async fn peek(&mut self, n: usize) -> Result<&[u8], WireError> {
        while self.buffered() < n {
            if self.fill().await? == 0 {
                return Err(WireError::ShortRead {
                    expected: n,
                    received: self.buffered(),
                });
            }
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    async fn fill(&mut self) -> Result<usize, WireError> {
        if self.pos > 0 && self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
        }
        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK, 0);
        let read = match self.inner.read(&mut self.buf[start..]).await {
            // A secure channel closed without close_notify ends the same way.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(0),
            other => other,
        };
        let n = *read.as_ref().unwrap_or(&0);
        self.buf.truncate(start + n);
        Ok(read?)
    }
}

/// Parse one request from `reader`.
pub async fn parse_request<R>(
    reader: &mut MessageReader<R>,
    limits: &LimitsConfig,
) -> Result<Http1Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let (method, target, protocol_version) = read_request_line(reader).await?;

    let mut request = Http1Request {
        method,
        target: resolve_target(&target),
        protocol_version,
        headers: Headers::new(),
        body: Vec::new(),
    };

    read_headers(reader, &mut request.headers).await?;
    request.body = read_body(reader, &request.headers, limits.max_body_bytes).await;

    Ok(request)
}

/// Example: `GET / HTTP/1.1`
async fn read_request_line<R>(
    reader: &mut MessageReader<R>,
) -> Result<(String, String, String), ParseError>
where
    R: AsyncRead + Unpin,
{
    let line = reader.read_line().await.inspect_err(|e| {
        tracing::warn!(error = %e, "Failed to read the request line");
    })?;

    split_request_line(line.trim())
}

/// Split a trimmed request line into method, target and protocol version.
///
/// All three tokens must be non-empty, so a doubled space is malformed.
pub fn split_request_line(line: &str) -> Result<(String, String, String), ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        [method, target, protocol] if !method.is_empty() && !target.is_empty() && !protocol.is_empty() => {
            Ok((method.to_string(), target.to_string(), protocol.to_string()))
        }
        _ => Err(ParseError::MalformedRequestLine(line.to_string())),
    }
}

async fn read_headers<R>(reader: &mut MessageReader<R>, headers: &mut Headers) -> Result<(), ParseError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let line = reader.read_line().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to read a header line");
        })?;

        match split_header(line.trim()) {
            Some((name, value)) => headers.insert(name, value),
            None => return Ok(()),
        }
    }
}

/// Split a trimmed header line at its first `:`.
///
/// Returns `None` for the empty line ending the header block. A line without
/// a colon becomes a name with an empty value.
pub fn split_header(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    match line.split_once(':') {
        Some((name, value)) => Some((name, value.trim())),
        None => Some((line, "")),
    }
}

/// Peek the body. Read failures leave the body empty.
async fn read_body<R>(reader: &mut MessageReader<R>, headers: &Headers, max_body: usize) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    // User agents SHOULD send Content-Length but are not required to. Without
    // it the body is whatever arrived with the head.
    let length = headers
        .get_ignore_case(HEADER_CONTENT_LENGTH)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or_else(|| reader.buffered());

    if length > max_body {
        tracing::warn!(length, max_body, "Request body exceeds limit, ignoring it");
        return Vec::new();
    }

    match reader.peek(length).await {
        Ok(body) => body.to_vec(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read the body");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn parse(input: &[u8]) -> Result<Http1Request, ParseError> {
        let mut reader = MessageReader::new(input, 8 * 1024);
        parse_request(&mut reader, &LimitsConfig::default()).await
    }

    #[test]
    fn request_line_needs_three_tokens() {
        assert!(split_request_line("GET / HTTP/1.1").is_ok());
        for line in ["GET /", "GET / HTTP/1.1 extra", "GET  / HTTP/1.1", ""] {
            assert!(
                matches!(split_request_line(line), Err(ParseError::MalformedRequestLine(_))),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn empty_tokens_are_malformed() {
        for line in ["GET  HTTP/1.1", " / HTTP/1.1", "GET / "] {
            assert!(
                matches!(split_request_line(line), Err(ParseError::MalformedRequestLine(_))),
                "{line:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn request_with_empty_target_is_rejected() {
        let err = parse(b"GET  HTTP/1.1\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine(_)));
    }

    #[test]
    fn header_splits_at_first_colon() {
        assert_eq!(split_header("Host: localhost:8080"), Some(("Host", "localhost:8080")));
        assert_eq!(split_header("X-Empty:"), Some(("X-Empty", "")));
        assert_eq!(split_header("NoColon"), Some(("NoColon", "")));
        assert_eq!(split_header(""), None);
    }

    #[tokio::test]
    async fn parses_full_request() {
        let request = parse(
            b"GET / HTTP/1.1\r\n\
              Host: www.example.com\r\n\
              User-Agent:   Mozilla/5.0  \r\n\
              Accept: text/html\r\n\
              \r\n",
        )
        .await
        .unwrap();

        assert_eq!(request.method, "GET");
        assert_eq!(request.target, "/index.html");
        assert_eq!(request.protocol_version, "HTTP/1.1");
        assert_eq!(request.headers.len(), 3);
        assert_eq!(request.headers.get("User-Agent"), Some("Mozilla/5.0"));
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn other_targets_pass_through() {
        let request = parse(b"GET /foo.css HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(request.target, "/foo.css");

        let request = parse(b"GET /a/../b%20c HTTP/1.0\n\n").await.unwrap();
        assert_eq!(request.target, "/a/../b%20c");
        assert_eq!(request.protocol_version, "HTTP/1.0");
    }

    #[tokio::test]
    async fn malformed_request_line_aborts() {
        let err = parse(b"GET /\r\nHost: x\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::MalformedRequestLine(ref l) if l == "GET /"));
    }

    #[tokio::test]
    async fn duplicate_headers_last_wins() {
        let request = parse(b"GET / HTTP/1.1\r\nX-A: 1\r\nX-B: 2\r\nX-A: 3\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(request.headers.get("X-A"), Some("3"));
        assert_eq!(request.headers.len(), 2);
    }

    #[tokio::test]
    async fn body_uses_content_length() {
        let request = parse(b"POST /form HTTP/1.1\r\nContent-Length: 7\r\n\r\nfoo=barEXTRA")
            .await
            .unwrap();
        assert_eq!(request.body, b"foo=bar");
    }

    #[tokio::test]
    async fn body_without_length_is_what_is_buffered() {
        let request = parse(b"POST /form HTTP/1.1\r\n\r\nhello, world!").await.unwrap();
        assert_eq!(request.body, b"hello, world!");
    }

    #[tokio::test]
    async fn short_body_is_observed_as_empty() {
        let request = parse(b"POST /form HTTP/1.1\r\nContent-Length: 50\r\n\r\nshort")
            .await
            .unwrap();
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn unparseable_length_falls_back_to_buffered() {
        let request = parse(b"POST /form HTTP/1.1\r\nContent-Length: -1\r\n\r\nabc")
            .await
            .unwrap();
        assert_eq!(request.body, b"abc");
    }

    #[tokio::test]
    async fn body_is_peeked_not_consumed() {
        let mut reader = MessageReader::new(
            &b"PUT /x HTTP/1.1\r\nContent-Length: 4\r\n\r\ndata"[..],
            1024,
        );
        let request = parse_request(&mut reader, &LimitsConfig::default()).await.unwrap();
        assert_eq!(request.body, b"data");
        assert_eq!(reader.buffered(), 4);
        assert_eq!(reader.peek(4).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn eof_inside_headers_is_short_read() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: x\r\n").await.unwrap_err();
        assert!(matches!(err, ParseError::Wire(WireError::ShortRead { .. })));
    }

    #[tokio::test]
    async fn overlong_line_is_rejected() {
        let mut input = b"GET /".to_vec();
        input.extend(std::iter::repeat(b'a').take(64));
        let mut reader = MessageReader::new(&input[..], 16);
        let err = parse_request(&mut reader, &LimitsConfig::default()).await.unwrap_err();
        assert!(matches!(err, ParseError::LineTooLong { limit: 16 }));
    }

    #[tokio::test]
    async fn peek_waits_for_late_bytes() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = MessageReader::new(server, 1024);

        tokio::spawn(async move {
            client.write_all(b"ab").await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"cd").await.unwrap();
        });

        assert_eq!(reader.peek(4).await.unwrap(), b"abcd");
        assert!(reader.read_line().await.is_err());
    }
}
