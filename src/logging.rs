// src/logging.rs

//! Logging setup for `devloop` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `DEVLOOP_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR. The supervised app's own output is re-logged under the
//! `app` target, which `--quiet-app` switches off.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Target the supervised app's stdout/stderr is logged under.
pub const APP_TARGET: &str = "app";

/// Dependencies that are chatty at `debug` and below.
const NOISY_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "notify", "tower_http"];

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, quiet_app: bool) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("DEVLOOP_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO),
    };

    let filter = EnvFilter::try_new(filter_directives(level, quiet_app))
        .context("building log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// `EnvFilter` directives for `level`: dependencies are capped at `warn`
/// unless tracing everything.
pub fn filter_directives(level: Level, quiet_app: bool) -> String {
    let base = level.as_str().to_ascii_lowercase();
    let mut directives = vec![base];
    if level < Level::TRACE {
        directives.extend(NOISY_CRATES.iter().map(|c| format!("{c}=warn")));
    }
    if quiet_app {
        directives.push(format!("{APP_TARGET}=off"));
    }
    directives.join(",")
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
