//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, ServerName};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use twinport::net::Listener;
use twinport::{Server, ServerConfig, Shutdown};

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

/// Self-signed certificate for `localhost`.
pub struct TestCert {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
    pub cert_der: CertificateDer<'static>,
}

pub fn self_signed() -> TestCert {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    TestCert {
        cert_pem: cert.cert.pem().into_bytes(),
        key_pem: cert.key_pair.serialize_pem().into_bytes(),
        cert_der: CertificateDer::from(cert.cert.der().to_vec()),
    }
}

/// A fresh public root containing `files`.
pub fn scratch_public(name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("twinport-it-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    for (file, contents) in files {
        std::fs::write(dir.join(file), contents).unwrap();
    }
    dir
}

/// Start a server. `tls` of `None` serves plaintext without a handshake.
pub async fn start_server(mut config: ServerConfig, tls: Option<&TestCert>) -> TestServer {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.external_port).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = match tls {
        Some(cert) => {
            let rustls = RustlsConfig::from_pem(cert.cert_pem.clone(), cert.key_pem.clone())
                .await
                .unwrap();
            Server::with_tls(config, &rustls)
        }
        None => {
            config.tls.enabled = false;
            Server::new(config).await.unwrap()
        }
    };

    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Complete a TLS handshake against `addr`, trusting only `cert`.
pub async fn tls_connect(addr: SocketAddr, cert: &TestCert) -> TlsStream<TcpStream> {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert.cert_der.clone()).unwrap();
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let tcp = TcpStream::connect(addr).await.unwrap();
    let domain = ServerName::try_from("localhost").unwrap();
    TlsConnector::from(Arc::new(config))
        .connect(domain, tcp)
        .await
        .unwrap()
}

/// Read until the peer closes or errors, returning whatever arrived.
pub async fn read_until_closed<R: AsyncRead + Unpin>(reader: &mut R) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => return received,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
}
