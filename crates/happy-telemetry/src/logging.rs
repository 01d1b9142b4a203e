//! Structured logging setup backed by `tracing-subscriber` and
//! `tracing-appender`.
//!
//! The CLI daemon and relay server both call [`setup_logging`] once at
//! startup. Per the ambient logging policy, no user content (message
//! bodies, ciphertext, decrypted text) is ever passed to `tracing` — only
//! entity refs, seq/version numbers, and error classes. That discipline is
//! enforced by callers, not by this crate; this crate only wires up where
//! the resulting lines go and how they're shaped.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colorized, multi-line.
    Pretty,
    /// Single-line compact text.
    Compact,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error.
    Stderr,
    /// A daily-rotating file under the given directory.
    RotatingFile(PathBuf),
    /// Both stderr and a daily-rotating file.
    Both(PathBuf),
}

/// Logging configuration, built up with the `with_*` builder methods and
/// passed to [`setup_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    directive: String,
    format: LogFormat,
    target: LogTarget,
    extra_directives: Vec<String>,
}

impl LogConfig {
    /// Creates a new configuration with the given default level directive
    /// (e.g. `"info"`, `"debug"`), logging to stderr in pretty format.
    #[must_use]
    pub fn new(default_directive: impl Into<String>) -> Self {
        Self {
            directive: default_directive.into(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            extra_directives: Vec::new(),
        }
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Adds a per-module directive (e.g. `"happy_mcp=trace"`), applied on
    /// top of the default.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    /// Builds the state-dir-rooted config this workspace uses everywhere
    /// outside tests: info level, daily-rotating files under
    /// `<state-dir>/logs/`, JSON lines mirrored to stderr.
    #[must_use]
    pub fn for_state_dir(state_dir: &Path) -> Self {
        Self::new("info").with_target(LogTarget::Both(state_dir.join("logs")))
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_new(&self.directive).unwrap_or_else(|_| EnvFilter::new("info"));
        for directive in &self.extra_directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }
}

fn rolling_writer(dir: &Path) -> TelemetryResult<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, "happy");
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// Returns a [`WorkerGuard`] that must be kept alive for the process
/// lifetime when a file target is in use — dropping it stops the
/// non-blocking file writer from flushing.
///
/// # Errors
///
/// Returns [`TelemetryError::InitError`] if a global subscriber was already
/// installed, or [`TelemetryError::IoError`] if a rotating file target's
/// directory could not be created.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<Option<WorkerGuard>> {
    let filter = config.env_filter();
    let init_result = match (&config.target, config.format) {
        (LogTarget::Stderr, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
        }
        (LogTarget::Stderr, LogFormat::Compact) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .try_init()
        }
        (LogTarget::Stderr, LogFormat::Json) => {
            tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer().json()).try_init()
        }
        (LogTarget::RotatingFile(dir), format) => {
            let (writer, guard) = rolling_writer(dir)?;
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            let result = match format {
                LogFormat::Json => tracing_subscriber::registry().with(filter).with(layer.json()).try_init(),
                LogFormat::Compact => tracing_subscriber::registry().with(filter).with(layer.compact()).try_init(),
                LogFormat::Pretty => tracing_subscriber::registry().with(filter).with(layer).try_init(),
            };
            return result.map(|()| Some(guard)).map_err(|e| TelemetryError::InitError(e.to_string()));
        }
        (LogTarget::Both(dir), format) => {
            let (writer, guard) = rolling_writer(dir)?;
            let file_layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false).json();
            let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            let result = match format {
                LogFormat::Compact => {
                    tracing_subscriber::registry().with(filter).with(stderr_layer.compact()).with(file_layer).try_init()
                }
                LogFormat::Json => {
                    tracing_subscriber::registry().with(filter).with(stderr_layer.json()).with(file_layer).try_init()
                }
                LogFormat::Pretty => {
                    tracing_subscriber::registry().with(filter).with(stderr_layer.pretty()).with(file_layer).try_init()
                }
            };
            return result.map(|()| Some(guard)).map_err(|e| TelemetryError::InitError(e.to_string()));
        }
    };
    init_result.map(|()| None).map_err(|e| TelemetryError::InitError(e.to_string()))
}

/// Installs a reasonable default subscriber (`info`, pretty, stderr). Used
/// by short-lived CLI invocations and tests that don't need file rotation.
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info")).map(|_| ())
}
