use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::infra::{config::LogConfig, error::AppError, storage_layout::StorageLayout};

const LOG_FILE_PREFIX: &str = "campus.log";

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
///
/// Console output goes to stderr so it never interleaves with command output.
/// When file logging is enabled the returned guard must be held until exit so
/// buffered lines are flushed.
pub fn init(config: &LogConfig, layout: &StorageLayout) -> Result<Option<WorkerGuard>, AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .boxed();

    let (file, guard) = if config.file {
        let appender = tracing_appender::rolling::daily(&layout.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(writer)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|error| AppError::LoggingInit(Box::new(error)))?;

    Ok(guard)
}
