//! File-based logging.
//!
//! Logs go to `<log_dir>/lyrebird.log.YYYY-MM-DD` with daily rotation, since the
//! interactive player owns the terminal. `RUST_LOG` overrides the default filter.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "lyrebird.log";

/// Installs the global subscriber. Keep the returned guard alive until exit or
/// buffered lines are lost.
///
/// `dev` additionally mirrors everything to stderr.
pub fn init_logging(log_dir: &Path, dev: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lyrebird=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr).with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    tracing::info!("Logging to {}", log_dir.display());
    Ok(guard)
}
