//! Tracing setup for the gateway process.
//!
//! `RUST_LOG`, when set and valid, replaces the configured level entirely.
//! Otherwise the configured level applies to the gateway, while the HTTP
//! stack (hyper, reqwest, rustls, h2) is capped at `warn`.

use std::env;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

const TRANSPORT_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Install the global subscriber, writing to stderr.
pub fn init(level: &str) -> Result<(), AppError> {
    let filter = build_filter(env::var("RUST_LOG").ok().as_deref(), level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))?;

    Ok(())
}

/// Filter from an optional `RUST_LOG` value and the configured level.
///
/// An unparsable `RUST_LOG` is ignored in favour of `level`.
pub fn build_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter, AppError> {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return Ok(filter);
        }
    }

    let level = parse_level(level)?;
    EnvFilter::try_new(gateway_directives(level))
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
}

/// `<level>` for everything, transport crates capped at `warn` unless the
/// level is already stricter.
fn gateway_directives(level: LevelFilter) -> String {
    let transport = level.min(LevelFilter::WARN);
    let mut directives = level.to_string().to_lowercase();
    for target in TRANSPORT_TARGETS {
        directives.push_str(&format!(",{target}={}", transport.to_string().to_lowercase()));
    }
    directives
}

/// Parse a log level string. Used to validate the configured level at load time.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
