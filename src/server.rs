//! Connection server.
//!
//! # Responsibilities
//! - Accept connections until shutdown is signalled
//! - Give every connection its own task, span and deadline
//! - Classify the transport and hand the channel to the protocol handler
//! - Record per-connection metrics and log how each connection ended
//!
//! ```text
//! accept ──► spawn ──► Deadline ──► classify ──► Secure ─────────► HTTP/1.1 | HTTP/2
//!                                       │
//!                                       ├──► PlaintextFallback ──► redirect | serve | close
//!                                       └──► Rejected ───────────► log, close
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::{Protocol, ServerConfig};
use crate::error::ConnectionError;
use crate::files::StaticFiles;
use crate::http1::Http1Handler;
use crate::http2::{FrameCodec, Http2Handler};
use crate::net::{classify, load_tls_config, ConnectionOutcome, ConnectionTracker, Deadline, Listener, RustlsTransport};
use crate::observability::metrics;

/// Grace period on top of the connection deadline when draining at shutdown.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load TLS configuration: {0}")]
    Tls(#[source] io::Error),
}

/// Read-only state shared by every connection task.
struct ConnectionContext {
    protocol: Protocol,
    tls: Option<RustlsTransport>,
    require_secure: bool,
    redirect_host: String,
    external_port: u16,
    timeout: Duration,
    http1: Http1Handler,
    http2: Http2Handler,
}

/// A single-protocol listener loop.
pub struct Server {
    config: ServerConfig,
    tls: Option<RustlsTransport>,
    tracker: ConnectionTracker,
}

impl Server {
    /// Build a server, loading the certificate and key when TLS is enabled.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let tls = if config.tls.enabled {
            let rustls = load_tls_config(Path::new(&config.tls.cert_path), Path::new(&config.tls.key_path))
                .await
                .map_err(ServerError::Tls)?;
            tracing::info!(cert = %config.tls.cert_path, "TLS enabled");
            Some(RustlsTransport::new(&rustls))
        } else {
            tracing::warn!("TLS disabled, serving plaintext only");
            None
        };

        Ok(Self {
            config,
            tls,
            tracker: ConnectionTracker::new(),
        })
    }

    /// Build a server around an already loaded TLS configuration.
    pub fn with_tls(config: ServerConfig, tls: &RustlsConfig) -> Self {
        Self {
            config,
            tls: Some(RustlsTransport::new(tls)),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Live connection count.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then wait for in-flight
    /// connections to finish.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        let ctx = Arc::new(ConnectionContext {
            protocol: self.config.listener.protocol,
            tls: self.tls,
            require_secure: self.config.tls.require_secure,
            redirect_host: self.config.tls.redirect_host.clone(),
            external_port: listener.external_port(),
            timeout: self.config.timeouts.connection(),
            http1: Http1Handler::new(
                StaticFiles::new(self.config.files.public_root.clone()),
                self.config.limits.clone(),
            ),
            http2: Http2Handler::new(FrameCodec::new(
                self.config.http2.strict_preface,
                self.config.http2.max_frame_payload,
            )),
        });

        tracing::info!(
            protocol = %ctx.protocol,
            secure = ctx.tls.is_some(),
            "Server accepting connections"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::error!(error = %e, "Accept failed");
                            tokio::task::yield_now().await;
                            continue;
                        }
                    };

                    let guard = self.tracker.track();
                    let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(
                        async move {
                            let start = Instant::now();
                            let (outcome, result) = ctx.handle(stream).await;
                            metrics::record_connection(outcome);
                            metrics::record_connection_duration(start);
                            log_result(outcome, &result);
                            drop(guard);
                        }
                        .instrument(span),
                    );
                }
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let open = self.tracker.wait_idle(ctx.timeout + DRAIN_GRACE).await;
        if open > 0 {
            tracing::warn!(open, "Connections still open after drain");
        }
        tracing::info!("Server stopped");
    }
}

impl ConnectionContext {
    /// Serve one connection. Returns the classification label with the result.
    async fn handle(&self, stream: TcpStream) -> (&'static str, Result<(), ConnectionError>) {
        let mut stream = Deadline::new(stream, self.timeout);

        let Some(tls) = &self.tls else {
            let result = self.serve(&mut stream).await;
            close(&mut stream).await;
            return ("plaintext", result);
        };

        let outcome = classify(tls, stream).await;
        let label = outcome.label();
        let result = match outcome {
            ConnectionOutcome::Secure(mut channel) => {
                let result = self.serve(&mut channel).await;
                close(&mut channel).await;
                result
            }
            ConnectionOutcome::PlaintextFallback(mut replay) => {
                let result = self.plaintext(&mut replay).await;
                close(&mut replay).await;
                result
            }
            ConnectionOutcome::Rejected(e) if e.kind() == io::ErrorKind::TimedOut => Err(ConnectionError::TimedOut),
            ConnectionOutcome::Rejected(e) => Err(ConnectionError::HandshakeRejected(e)),
        };
        (label, result)
    }

    async fn serve<S>(&self, channel: &mut S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.protocol {
            Protocol::Http1 => self.http1.serve(channel).await,
            Protocol::Http2 => self.http2.serve(channel).await,
        }
    }

    async fn plaintext<S>(&self, channel: &mut S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.require_secure {
            return self.serve(channel).await;
        }

        match self.protocol {
            Protocol::Http1 => {
                self.http1
                    .redirect(channel, &self.redirect_host, self.external_port)
                    .await
            }
            Protocol::Http2 => {
                tracing::warn!("Plaintext client on a secure HTTP/2 port, closing");
                Ok(())
            }
        }
    }
}

async fn close<S: AsyncWrite + Unpin>(channel: &mut S) {
    if let Err(e) = channel.shutdown().await {
        tracing::trace!(error = %e, "Shutdown after response failed");
    }
}

fn log_result(outcome: &'static str, result: &Result<(), ConnectionError>) {
    match result {
        Ok(()) => tracing::debug!(outcome, "Connection finished"),
        Err(e) if e.kind() == "timeout" => tracing::info!(outcome, error = %e, "Connection timed out"),
        Err(e @ ConnectionError::HandshakeRejected(_)) => {
            tracing::warn!(outcome, error = %e, "Handshake failed")
        }
        Err(e) => tracing::warn!(outcome, kind = e.kind(), error = %e, "Connection failed"),
    }
}
