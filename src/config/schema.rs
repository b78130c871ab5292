//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, protocol).
    pub listener: ListenerConfig,

    /// Secure-transport settings.
    pub tls: TlsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Static file serving.
    pub files: FilesConfig,

    /// HTTP/2 codec settings.
    pub http2: Http2Config,

    /// Parser limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which protocol generation a listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http1,
    Http2,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http1 => write!(f, "HTTP/1.1"),
            Protocol::Http2 => write!(f, "HTTP/2"),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Protocol served on this port.
    pub protocol: Protocol,

    /// Port advertised in redirect URLs. Defaults to the bound port.
    pub external_port: Option<u16>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            protocol: Protocol::Http1,
            external_port: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Attempt a handshake on every accepted connection.
    pub enabled: bool,

    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Redirect (HTTP/1.1) or drop (HTTP/2) plaintext clients instead of serving them.
    pub require_secure: bool,

    /// Host placed in the `Location` header of plaintext redirects.
    pub redirect_host: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cert_path: "tls/test.pem".to_string(),
            key_path: "tls/test.key".to_string(),
            require_secure: true,
            redirect_host: "localhost".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for all reads and writes on one connection, in seconds.
    pub connection_secs: u64,
}

impl TimeoutConfig {
    pub fn connection(&self) -> Duration {
        Duration::from_secs(self.connection_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connection_secs: 2 }
    }
}

/// Static file serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory that request targets are appended to.
    pub public_root: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            public_root: "public".to_string(),
        }
    }
}

/// HTTP/2 codec configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Http2Config {
    /// Compare the 24-octet preface against the literal client preface.
    pub strict_preface: bool,

    /// Largest frame payload accepted, in bytes.
    pub max_frame_payload: u32,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            strict_preface: false,
            max_frame_payload: 16_384,
        }
    }
}

/// Parser limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body bytes peeked for one request.
    pub max_body_bytes: usize,

    /// Maximum length of a request or header line.
    pub max_line_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            max_line_bytes: 8 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
