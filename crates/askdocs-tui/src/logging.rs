use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

pub const LOG_FILE_NAME: &str = "askdocs.log";

/// Send logs to a file in `log_dir`; the terminal belongs to the UI.
///
/// `RUST_LOG` wins when set, otherwise `-v` raises the level from warn. The
/// returned guard must stay alive until exit so buffered lines get flushed.
pub fn setup_logging(log_dir: &Path, verbose: u8) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    std::fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::new(Rotation::NEVER, log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = NonBlocking::new(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    Registry::default().with(env_filter).with(file_layer).try_init()?;

    Ok(guard)
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info,askdocs_core=info,askdocs=info",
        2 => "info,askdocs_core=debug,askdocs=debug",
        _ => "debug,askdocs_core=trace,askdocs=trace",
    }
}
