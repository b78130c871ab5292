//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop)
//!     → connection.rs (connection ID, live-connection tracking)
//!     → deadline.rs (fixed per-connection deadline on all I/O)
//!     → classify.rs + tls.rs (handshake: secure / plaintext fallback / rejected)
//!     → Hand off to the HTTP/1.1 or HTTP/2 layer
//!
//! wire.rs: exact-length reads used by the HTTP/2 codec
//! ```
//!
//! # Design Decisions
//! - Classification runs inside the connection task, never on the accept path
//! - A plaintext client is recognised by the handshake's failure, not by sniffing
//! - Bytes consumed by a failed handshake are replayed to the plaintext handler

pub mod classify;
pub mod connection;
pub mod deadline;
pub mod listener;
pub mod tls;
pub mod wire;

pub use classify::{classify, ConnectionOutcome, HandshakeFailure, Recorder, Replay, SecureTransport};
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use deadline::Deadline;
pub use listener::{Listener, ListenerError};
pub use tls::{load_tls_config, RustlsTransport};
pub use wire::read_exact;
