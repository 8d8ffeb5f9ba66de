//! Structured Logger
//!
//! Wraps `tracing` with environment-based level control, a console layer, and an
//! optional rolling JSON file layer.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global logger.
///
/// `RUST_LOG` takes precedence over `level`. When `log_dir` is set, events are also
/// written as NDJSON to `signshuffle.log.YYYY-MM-DD` inside it. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_logger(level: &str, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "signshuffle.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
