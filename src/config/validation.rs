//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! All errors are collected, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// Smallest value HTTP/2 allows for SETTINGS_MAX_FRAME_SIZE.
const MIN_FRAME_PAYLOAD: u32 = 16_384;
/// Largest value a 24-bit length field can carry.
const MAX_FRAME_PAYLOAD: u32 = (1 << 24) - 1;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }

    if config.listener.external_port == Some(0) {
        errors.push(ValidationError::new("listener.external_port", "must be non-zero"));
    }

    if config.tls.enabled {
        if config.tls.cert_path.is_empty() {
            errors.push(ValidationError::new("tls.cert_path", "must not be empty"));
        }
        if config.tls.key_path.is_empty() {
            errors.push(ValidationError::new("tls.key_path", "must not be empty"));
        }
        if config.tls.redirect_host.is_empty() {
            errors.push(ValidationError::new("tls.redirect_host", "must not be empty"));
        }
    }

    if config.timeouts.connection_secs == 0 {
        errors.push(ValidationError::new("timeouts.connection_secs", "must be greater than 0"));
    }

    if config.files.public_root.is_empty() {
        errors.push(ValidationError::new("files.public_root", "must not be empty"));
    }

    if !(MIN_FRAME_PAYLOAD..=MAX_FRAME_PAYLOAD).contains(&config.http2.max_frame_payload) {
        errors.push(ValidationError::new(
            "http2.max_frame_payload",
            format!("must be within {MIN_FRAME_PAYLOAD}..={MAX_FRAME_PAYLOAD}"),
        ));
    }

    if config.limits.max_line_bytes == 0 {
        errors.push(ValidationError::new("limits.max_line_bytes", "must be greater than 0"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
