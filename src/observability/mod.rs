//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Connection tasks produce:
//!     → logging.rs (structured log events, one span per connection)
//!     → metrics.rs (counters and a duration histogram)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or the configured level)
//!     → Prometheus scrape endpoint (only when metrics are enabled)
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until a recorder is installed
//! - Log level comes from config unless RUST_LOG is set

pub mod logging;
pub mod metrics;
