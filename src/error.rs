//! Error taxonomy shared by the wire, parsing and connection layers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the exact-length wire reader.
#[derive(Debug, Error)]
pub enum WireError {
    /// The stream ended before the requested number of bytes arrived.
    #[error("unexpected end of buffer: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// Transport error other than a short read.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// True when the peer closed the stream before sending a single byte.
    pub fn is_clean_eof(&self) -> bool {
        matches!(self, WireError::ShortRead { received: 0, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WireError::Io(e) if e.kind() == io::ErrorKind::TimedOut)
    }
}

/// Failures while turning bytes into protocol messages.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The HTTP/1.1 request line did not have exactly three tokens.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A line grew past the configured limit without a terminator.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// A frame announced a payload larger than this endpoint accepts.
    #[error("frame payload of {length} bytes exceeds limit of {max}")]
    FrameTooLarge { length: u32, max: u32 },

    /// Strict preface checking is enabled and the client sent something else.
    #[error("invalid connection preface: {0:?}")]
    InvalidPreface(Vec<u8>),
}

impl ParseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ParseError::Wire(w) if w.is_timeout())
    }
}

/// Anything that ends a single connection's handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Secure-transport failure that does not look like plaintext.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(io::Error),

    /// Response bytes could not be fully written.
    #[error("write failure: {0}")]
    WriteFailure(io::Error),

    /// The requested file is not available under the public root.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The per-connection deadline elapsed.
    #[error("connection deadline exceeded")]
    TimedOut,
}

impl ConnectionError {
    /// Maps a write-side I/O error, keeping deadline expiry distinct.
    pub fn from_write(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::TimedOut {
            ConnectionError::TimedOut
        } else {
            ConnectionError::WriteFailure(err)
        }
    }

    /// Stable label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionError::Parse(ParseError::Wire(WireError::ShortRead { .. })) => "short_read",
            ConnectionError::Parse(p) if p.is_timeout() => "timeout",
            ConnectionError::Parse(ParseError::MalformedRequestLine(_)) => "malformed_request_line",
            ConnectionError::Parse(_) => "parse",
            ConnectionError::HandshakeRejected(_) => "handshake_rejected",
            ConnectionError::WriteFailure(_) => "write_failure",
            ConnectionError::FileNotFound(_) => "file_not_found",
            ConnectionError::TimedOut => "timeout",
        }
    }
}
