//! twinport: HTTP/1.1 and minimal HTTP/2 over a single port that accepts
//! both TLS and plaintext clients.

pub mod config;
pub mod error;
pub mod files;
pub mod http1;
pub mod http2;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod server;

pub use config::schema::{Protocol, ServerConfig};
pub use error::{ConnectionError, ParseError, WireError};
pub use lifecycle::Shutdown;
pub use server::{Server, ServerError};
