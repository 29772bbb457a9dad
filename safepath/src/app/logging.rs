//! Process-wide tracing setup.
//!
//! Log records go to stderr by default, or to daily-rotated files when
//! a log directory is given. The filter comes from `RUST_LOG` when set,
//! otherwise `info` (or `debug` in verbose mode). Timestamps use the
//! local UTC offset when the platform can determine it.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive.
///
/// Dropping the guard flushes and stops the writer, so hold it for the
/// lifetime of the process (typically a `let _guard` in `main`).
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `verbose` - Lower the default filter from `info` to `debug`
/// * `log_dir` - Write to `safepath.log.*` files in this directory
///   instead of stderr
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> LogGuard {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    });

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "safepath.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            LogGuard {
                _worker: Some(guard),
            }
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_timer(timer)
                .with_writer(std::io::stderr)
                .init();
            LogGuard { _worker: None }
        }
    }
}
