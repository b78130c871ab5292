//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI flags applied on top in main.rs
//!     → validation.rs (semantic checks, once)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with every connection task
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    FilesConfig, Http2Config, LimitsConfig, ListenerConfig, ObservabilityConfig, Protocol,
    ServerConfig, TimeoutConfig, TlsConfig,
};
