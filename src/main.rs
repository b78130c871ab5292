//! twinport
//!
//! Serves static files over HTTP/1.1, or completes the opening SETTINGS
//! exchange over HTTP/2, on one port that takes TLS and plaintext clients.
//!
//! ```text
//!     Client ──► Listener ──► connection task ──► classify (TLS / plaintext / reject)
//!                                                    │
//!                                  ┌─────────────────┴─────────────────┐
//!                                  ▼                                   ▼
//!                           HTTP/1.1 parser                     HTTP/2 frame codec
//!                           static files / 301                  SETTINGS ACK
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use twinport::config::{read_config, validation::validate_config, ServerConfig};
use twinport::lifecycle::{wait_for_signal, Shutdown};
use twinport::net::Listener;
use twinport::observability::{logging, metrics};
use twinport::{Protocol, Server};

#[derive(Parser)]
#[command(name = "twinport")]
#[command(about = "HTTP/1.1 and HTTP/2 on one port, TLS or plaintext", long_about = None)]
struct Cli {
    /// HTTP version the listener speaks.
    #[arg(short = 'v', long = "http-version", value_enum)]
    http_version: Option<HttpVersion>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum HttpVersion {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

impl Cli {
    fn is_empty(&self) -> bool {
        self.http_version.is_none() && self.port.is_none() && self.config.is_none()
    }

    /// Flags take precedence over the file.
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(version) = self.http_version {
            config.listener.protocol = match version {
                HttpVersion::One => Protocol::Http1,
                HttpVersion::Two => Protocol::Http2,
            };
        }
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{port}"),
            };
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);

    logging::init_logging(&config.observability.log_level);
    tracing::info!("twinport v{} starting", env!("CARGO_PKG_VERSION"));

    if cli.is_empty() {
        tracing::info!("No arguments provided, running with defaults (HTTP/1.1 on port 8080). Run with -h for usage");
    }

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(field = error.field, "{}", error.message);
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        protocol = %config.listener.protocol,
        tls = config.tls.enabled,
        connection_timeout_secs = config.timeouts.connection_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;
    let server = Server::new(config).await?;

    let shutdown = Shutdown::new();
    let accept_stop = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            shutdown.trigger();
        }
    });

    server.run(listener, accept_stop).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
