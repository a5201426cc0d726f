//! Log output for the binary.
//!
//! Everything goes to stderr so stdout carries only the conversation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Variable read when `RUST_LOG` is unset
pub const ENV_LOG: &str = "DUET_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Filter directive: `RUST_LOG`, else `DUET_LOG`, else `info`.
pub fn log_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    ["RUST_LOG", ENV_LOG]
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let directive = log_directive(|key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{}': {}", directive, e);
        EnvFilter::new(DEFAULT_DIRECTIVE)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init();
}
