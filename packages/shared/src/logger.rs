//! Logging setup for the Quill binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the `quill_*` library crates and the binary itself.
/// `RUST_LOG` takes precedence when it is set.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "quill_server")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use quill_shared::logger::setup_logger;
///
/// setup_logger("quill_server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    format!(
        "quill_shared={level},quill_server={level},{bin}={level},tower_http=info",
        level = default_log_level,
        bin = binary_name.replace('-', "_"),
    )
}
