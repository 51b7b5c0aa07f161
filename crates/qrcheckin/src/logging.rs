//! Log setup for the `qrcheckin` binary.
//!
//! The console owns stdout, so log lines go to stderr. Only our two crates
//! log at the chosen level; `reqwest`, `hyper` and `nokhwa` stay at their
//! defaults unless `RUST_LOG` says otherwise.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events the default filter lets through.
const LOG_TARGETS: &[&str] = &["qrcheckin", "qrcheckin_camera"];

/// How much the binary logs, from `-q` up to `-vvv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: errors only.
    Quiet,
    /// Warnings, such as a failed snapshot write.
    #[default]
    Normal,
    /// `-v`: sheet connections and entry stamps.
    Verbose,
    /// `-vv`: lookups and scan start/stop.
    Debug,
    /// `-vvv`: one line per frame.
    Trace,
}

impl Verbosity {
    /// The most detailed level that gets logged.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directives used when `RUST_LOG` is unset.
    #[must_use]
    pub fn directives(self) -> String {
        let level = self.level();
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbosity`.
///
/// Later calls are no-ops.
///
/// ```no_run
/// use qrcheckin::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Debug);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init();
}
