//! Tracing subscriber setup

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Logging setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed
    #[error("Failed to initialize logging: {0}")]
    Init(String),
}

/// Map a level name to a tracing level; unknown names fall back to warn
pub fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Install the global subscriber, writing to stderr
///
/// `debug` forces the debug level. `RUST_LOG` takes precedence over both when
/// set.
pub fn init_tracing(config: &LoggingConfig, debug: bool) -> Result<(), LoggingError> {
    let level = if debug {
        Level::DEBUG
    } else {
        parse_level(&config.level)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let result = match config.format.as_str() {
        "json" => registry.with(fmt.json()).try_init(),
        "pretty" => registry.with(fmt.pretty()).try_init(),
        _ => registry.with(fmt.compact().with_target(false)).try_init(),
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
