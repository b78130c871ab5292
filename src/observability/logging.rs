//! Structured logging.
//!
//! Uses the tracing crate. `RUST_LOG` takes precedence over the configured
//! level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("twinport={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_targets_this_crate() {
        assert_eq!(default_filter("debug"), "twinport=debug");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging("info");
        init_logging("trace");
    }
}
