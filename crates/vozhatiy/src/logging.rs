//! Tracing setup for the `vozhatiy` binary and tests.
//!
//! Diagnostics go to stderr; stdout is reserved for reports and listings so
//! `--format json` output can be piped.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the log output is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Warnings, e.g. degraded reports or ignored duplicate marks.
    #[default]
    Normal,
    /// Lifecycle messages such as migrations and finished reports (`-v`).
    Verbose,
    /// Everything, including skipped events (`-vv`).
    Trace,
}

impl Verbosity {
    /// Pick a verbosity from the `-q` flag and the `-v` count. Quiet wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The most detailed level let through.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Trace => Level::TRACE,
        }
    }

    fn directive(self) -> String {
        format!("vozhatiy={}", self.level())
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set and valid, replaces the verbosity-derived filter.
/// Returns `false` if a subscriber was already installed.
///
/// # Examples
///
/// ```no_run
/// use vozhatiy::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Route warnings to the test harness' captured output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
