#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

fn enabled(rust_log: &str) -> bool {
    return rust_log.contains("terrier");
}

fn log_dir(override_dir: Option<String>) -> Result<path::PathBuf> {
    if let Some(dir) = override_dir.filter(|e| return !e.is_empty()) {
        return Ok(path::PathBuf::from(dir));
    }

    let Some(cache_dir) = dirs::cache_dir() else {
        bail!("Unable to find a cache directory for debug logs, set TERRIER_LOG_DIR");
    };

    return Ok(cache_dir.join("terrier"));
}

/// Writes JSON debug logs to `debug.log` when `RUST_LOG` mentions terrier.
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init() -> Result<Option<WorkerGuard>> {
    if !enabled(&env::var("RUST_LOG").unwrap_or_default()) {
        return Ok(None);
    }

    let debug_log_dir = log_dir(env::var("TERRIER_LOG_DIR").ok())?;
    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(writer)
        .try_init()
        .map_err(|err| return anyhow!(err))?;

    return Ok(Some(guard));
}
