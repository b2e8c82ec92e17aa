//! Diagnostics output.
//!
//! Command output goes to stdout; everything logged through `tracing` goes
//! to stderr, filtered per the `-q`/`-v` flags unless `RUST_LOG` is set.
//! A storage fallback is a warning, so it shows at the default level.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much diagnostic output the binary prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only (`-q`).
    Quiet,
    /// Warnings and errors.
    #[default]
    Normal,
    /// Adds loads, saves and migrations (`-v`).
    Verbose,
    /// Everything, down to individual migration steps (`-vv`).
    Trace,
}

impl Verbosity {
    /// The most detailed level shown.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive limiting output to this crate at this level.
    fn directive(self) -> String {
        format!("ctrack={}", self.to_level_filter())
    }
}

/// `RUST_LOG` if it parses, else the directive for `verbosity`.
fn filter_for(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init_logging(verbosity: Verbosity) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(filter_for(verbosity))
        .with(stderr_layer)
        .try_init();
}

/// Route warnings and errors into the test harness's captured output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
