//! Tracing setup shared by every command.
//!
//! The file layer is always installed. Console output is composed by the
//! binary, because interactive commands route it through progress bars and the
//! live console must not print log lines at all.

use crate::settings::LoggingConfig;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// A daily-rolling, non-blocking file layer.
///
/// The returned guard flushes buffered lines on drop and must be kept alive
/// for as long as the process logs.
pub fn file_layer<S>(config: &LoggingConfig) -> (impl Layer<S> + Send + Sync + 'static, WorkerGuard)
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    (layer, guard)
}
