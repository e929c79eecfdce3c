use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Route tracing output to a daily rolling file; the terminal belongs to the
/// UI. Keep the guard alive for as long as logs should be flushed.
pub fn init(log_dir: &Path, file_prefix: &str, debug: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_log_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");

        let guard = init(&log_dir, "test.log", true);
        assert!(log_dir.is_dir());
        // A second subscriber cannot be installed in the same process.
        if guard.is_ok() {
            assert!(init(&log_dir, "test.log", false).is_err());
        }
    }
}
