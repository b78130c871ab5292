//! HTTP/1.1 protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! secure channel or replayed plaintext stream
//!     → parser.rs (request line → headers → peeked body)
//!     → request.rs (Http1Request, logged)
//!     → server.rs (resolve file under the public root)
//!     → response.rs (200 head) + files.rs (file bytes)
//!
//! plaintext on a secure-only port:
//!     → server.rs redirect → response.rs (301 head) → close
//! ```

pub mod parser;
pub mod request;
pub mod response;
pub mod server;

pub use parser::{parse_request, MessageReader};
pub use request::{Headers, Http1Request};
pub use server::Http1Handler;
