//! Logging initialization for the data layer.
//!
//! Every crate logs through `tracing` macros. Hosts call [`init_logging`]
//! once at startup; libraries never install a subscriber themselves.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Initialize the logging system.
///
/// This sets up tracing with:
/// - Log level from `RUST_LOG` or the provided default
/// - Compact human-readable output on stderr
/// - JSON lines instead when `PLAYA_LOG_FORMAT=json`
///
/// Calling it again after a subscriber is installed is a no-op.
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Data provider ready");
/// ```
pub fn init_logging(level: &str) {
    let json = std::env::var("PLAYA_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).as_str().to_ascii_lowercase()));

    let output = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let result = tracing_subscriber::registry()
        .with(output.with_filter(env_filter))
        .try_init();

    if result.is_ok() {
        tracing::debug!(level, json, "logging initialized");
    }
}

/// Parse a log level string into a tracing Level.
fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
