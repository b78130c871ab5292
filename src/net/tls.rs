//! TLS configuration, certificate loading and the rustls-backed handshake.

use std::future::Future;
use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;
use rustls::InvalidMessage;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use crate::net::classify::{HandshakeFailure, SecureTransport};

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    if !cert_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

/// Server-side handshakes using rustls.
#[derive(Clone)]
pub struct RustlsTransport {
    acceptor: TlsAcceptor,
}

impl RustlsTransport {
    pub fn new(config: &RustlsConfig) -> Self {
        Self {
            acceptor: TlsAcceptor::from(config.get_inner()),
        }
    }
}

impl<S> SecureTransport<S> for RustlsTransport
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Channel = TlsStream<S>;

    fn handshake(
        &self,
        stream: S,
    ) -> impl Future<Output = Result<Self::Channel, HandshakeFailure<S>>> + Send {
        let accept = self.acceptor.accept(stream).into_fallible();
        async move {
            accept.await.map_err(|(error, stream)| {
                let is_plaintext_signature = is_plaintext_signature(&error);
                HandshakeFailure {
                    stream,
                    error,
                    is_plaintext_signature,
                }
            })
        }
    }

    fn transport_mut(channel: &mut Self::Channel) -> &mut S {
        channel.get_mut().0
    }
}

/// True when a handshake error came from a record header that is not TLS.
///
/// rustls rejects such input while deframing, before any handshake message
/// is parsed.
pub fn is_plaintext_signature(error: &io::Error) -> bool {
    error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        .is_some_and(|e| {
            matches!(
                e,
                rustls::Error::InvalidMessage(
                    InvalidMessage::InvalidContentType
                        | InvalidMessage::UnknownProtocolVersion
                        | InvalidMessage::MessageTooLarge
                )
            )
        })
}
