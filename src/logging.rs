use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::utils::logs_dir;

// Logs stop flushing once the guard is dropped.
pub fn init_tracing(data_dir: &Path) -> Result<WorkerGuard> {
    let dir = logs_dir(data_dir);
    std::fs::create_dir_all(&dir).context("create log dir")?;

    let appender = tracing_appender::rolling::daily(&dir, "likeness.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}
