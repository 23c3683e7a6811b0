use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const STDOUT_FILTER: &str = "info,web_request=info,db_query=warn,sqlx=off";
const FILE_FILTER: &str = "debug,web_request=debug,db_query=debug,sqlx=info,hyper=info,reqwest=info";

/// Installs stdout and daily-rolling file logging. `RUST_LOG` overrides the
/// stdout filter. Keep the returned guard alive until exit or buffered file
/// lines are lost.
pub fn configure_logging(log_dir: &Path) -> WorkerGuard {
    // Stdout log configuration
    let stdout_log = fmt::layer().with_writer(io::stdout).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDOUT_FILTER)),
    );

    // File log configuration
    let file_appender = rolling::daily(log_dir, "cvewatch.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();

    guard
}
