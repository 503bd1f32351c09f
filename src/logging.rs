//! Structured logging to stderr.
//!
//! stdout carries command output, so every layer writes to stderr. `RUST_LOG`
//! wins over the configured level when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_ansi(false)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
